use clap::{Args, Parser, Subcommand, ValueHint};
use clap_verbosity_flag::Verbosity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub commands: Commands,
    #[command(flatten)]
    pub verbose: Verbosity,

    /// Inventory snapshot to work on.
    /// Defaults to the configured inventory path.
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub inventory: Option<String>,
}

#[derive(Debug, Subcommand, Clone, Eq, PartialEq)]
pub enum Commands {
    /// Operations on virtual machines
    #[command(subcommand)]
    Vm(VmCrud),

    /// Operations on standalone disks
    #[command(subcommand)]
    Disk(DiskCrud),
}

#[derive(Debug, Subcommand, Clone, Eq, PartialEq)]
pub enum VmCrud {
    /// Print what a create or an update would do, without doing it.
    #[command(arg_required_else_help = true)]
    Plan(PlanArgs),
    /// Creates a virtual machine from a toml spec.
    #[command(arg_required_else_help = true)]
    Create(SpecArgs),
    /// Print the observed state of a virtual machine.
    #[command(arg_required_else_help = true)]
    Read(IdArgs),
    /// Converges a virtual machine towards a toml spec.
    #[command(arg_required_else_help = true)]
    Update(UpdateArgs),
    /// Removes(destroy) a virtual machine.
    #[command(arg_required_else_help = true)]
    Rm(IdArgs),
}

#[derive(Debug, Subcommand, Clone, Eq, PartialEq)]
pub enum DiskCrud {
    /// Creates a disk from a toml spec.
    #[command(arg_required_else_help = true)]
    Create(SpecArgs),
    #[command(arg_required_else_help = true)]
    Read(IdArgs),
    /// Renames or grows a disk.
    #[command(arg_required_else_help = true)]
    Update(UpdateArgs),
    #[command(arg_required_else_help = true)]
    Rm(IdArgs),
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SpecArgs {
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: String,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdArgs {
    #[arg(long, value_name = "ID")]
    pub id: String,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UpdateArgs {
    #[arg(long, value_name = "ID")]
    pub id: String,
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: String,
    /// Spec of the last successful run.
    /// Changes to immutable attributes are rejected against it.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub previous: Option<String>,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlanArgs {
    /// Plan an update of this vm instead of a creation.
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: String,
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath, requires = "id")]
    pub previous: Option<String>,
}
