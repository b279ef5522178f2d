mod types;
pub use types::*;

use crate::config::XovmConfig;
use crate::display::{DiskTable, PlanTable, VmTable};
use crate::reconcile::Reconciler;
use crate::repository::{Inventory, MemoryRepository};
use crate::state::{DiskSpec, VmSpec};

use clap::Parser;
use owo_colors::OwoColorize;

// Logger
use env_logger::Builder;

// Error Handling
use log::{debug, info};
use miette::Result;
use xovm_error::{LibError, XovmError};

impl Cli {
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        Self::switch(cli).await?;
        Ok(())
    }
    pub async fn switch(cli: Cli) -> Result<()> {
        // Set verbosity
        let verbosity = cli.verbose.log_level_filter();
        std::env::set_var("XOVM_LOG", verbosity.to_string().to_lowercase());
        // Tests run several commands in one process.
        Builder::from_env("XOVM_LOG").try_init().ok();

        let config = XovmConfig::get()?;
        let path = cli.inventory.unwrap_or(config.inventory.path.clone());
        debug!("Using inventory {}", path);
        let repo = MemoryRepository::new(Inventory::from_file(&path)?);
        let reconciler = Reconciler::new(&repo);

        let res = Self::dispatch(&reconciler, &config, cli.commands).await;

        // Persist whatever got applied, failed runs included.
        repo.snapshot().map_err(XovmError::from)?.to_file(&path)?;
        res
    }

    async fn dispatch(
        reconciler: &Reconciler<'_, MemoryRepository>,
        config: &XovmConfig,
        commands: Commands,
    ) -> Result<()> {
        match commands {
            /*
             * Operations on virtual machines
             */
            Commands::Vm(args) => match args {
                VmCrud::Plan(args) => {
                    let desired = Self::load_vm_spec(&args.file, config)?;
                    match args.id {
                        Some(id) => {
                            let previous = Self::load_previous(&args.previous)?;
                            match reconciler.plan_update(&id, previous.as_ref(), &desired).await? {
                                Some(plan) => {
                                    PlanTable::display(PlanTable::from_plan(&plan))?;
                                    println!("power gate: {}", plan.gate);
                                }
                                None => gone("vm", &id),
                            }
                        }
                        None => {
                            let params = reconciler.plan_create(&desired).await?;
                            println!("{}", serde_json::to_string_pretty(&params).map_err(XovmError::from)?);
                        }
                    }
                }
                VmCrud::Create(args) => {
                    let desired = Self::load_vm_spec(&args.file, config)?;
                    let vm = reconciler.create(&desired).await?;
                    info!("Created vm {}", vm.id);
                    VmTable::display(vec![VmTable::from(&vm)])?;
                }
                VmCrud::Read(args) => match reconciler.read(&args.id).await? {
                    Some(vm) => VmTable::display(vec![VmTable::from(&vm)])?,
                    None => gone("vm", &args.id),
                },
                VmCrud::Update(args) => {
                    let desired = Self::load_vm_spec(&args.file, config)?;
                    let previous = Self::load_previous(&args.previous)?;
                    match reconciler.update(&args.id, previous.as_ref(), &desired).await? {
                        Some(vm) => VmTable::display(vec![VmTable::from(&vm)])?,
                        None => gone("vm", &args.id),
                    }
                }
                VmCrud::Rm(args) => {
                    reconciler.delete(&args.id).await?;
                    println!("Deleted vm {}", args.id.bold().blue());
                }
            },
            /*
             * Operations on standalone disks
             */
            Commands::Disk(args) => match args {
                DiskCrud::Create(args) => {
                    let desired = DiskSpec::from_file(&args.file)?;
                    let disk = reconciler.create_disk(&desired).await?;
                    DiskTable::display(vec![DiskTable::from(&disk)])?;
                }
                DiskCrud::Read(args) => match reconciler.read_disk(&args.id).await? {
                    Some(disk) => DiskTable::display(vec![DiskTable::from(&disk)])?,
                    None => gone("disk", &args.id),
                },
                DiskCrud::Update(args) => {
                    if args.previous.is_some() {
                        let err = LibError::builder()
                            .msg("disks have no immutable attribute to check")
                            .help("Remove the --previous argument.")
                            .build();
                        return Err(XovmError::from(err).into());
                    }
                    let desired = DiskSpec::from_file(&args.file)?;
                    match reconciler.update_disk(&args.id, &desired).await? {
                        Some(disk) => DiskTable::display(vec![DiskTable::from(&disk)])?,
                        None => gone("disk", &args.id),
                    }
                }
                DiskCrud::Rm(args) => {
                    reconciler.delete_disk(&args.id).await?;
                    println!("Deleted disk {}", args.id.bold().blue());
                }
            },
        };
        Ok(())
    }

    /// The configured authorization applies when the spec leaves it off.
    fn load_vm_spec(path: &str, config: &XovmConfig) -> Result<VmSpec, XovmError> {
        let mut spec = VmSpec::from_file(path)?;
        if config.reconcile.allow_stopping_for_update {
            spec.allow_stopping_for_update = true;
        }
        Ok(spec)
    }
    fn load_previous(path: &Option<String>) -> Result<Option<VmSpec>, XovmError> {
        match path {
            Some(path) => Ok(Some(VmSpec::from_file(path)?)),
            None => Ok(None),
        }
    }
}

fn gone(kind: &str, id: &str) {
    println!("{} {} is gone", kind, id.bold().red());
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use crate::reconcile::fixtures;
    use crate::repository::Inventory;
    use crate::xo::PowerState;
    use clap::Parser;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use std::fs;
    use uuid::Uuid;

    fn tmp_path(name: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(format!("xovm-{}-{}.toml", name, Uuid::new_v4()));
        path.display().to_string()
    }

    #[test]
    fn parse_command_line() {
        let e = "xovm -vv --inventory ./inventory.toml vm update --id vm-web -f web.toml";
        let os_str: Vec<&str> = e.split(' ').collect();
        let cli = Cli::parse_from(os_str);
        assert_eq!(cli.inventory.as_deref(), Some("./inventory.toml"));
    }

    #[tokio::test]
    async fn update_through_the_cli() -> Result<()> {
        let inventory = tmp_path("inventory");
        fixtures::inventory().to_file(&inventory)?;
        let spec = tmp_path("spec");
        let mut desired = fixtures::spec();
        desired.desired_status = Some(crate::xo::DesiredPowerState::Halted);
        fs::write(&spec, toml::to_string(&desired).into_diagnostic()?).into_diagnostic()?;

        let e = format!("xovm --inventory {inventory} vm update --id {} -f {spec}", fixtures::VM);
        let cli = Cli::parse_from(e.split(' '));
        Cli::switch(cli).await?;

        // Written back.
        let res = Inventory::from_file(&inventory)?;
        assert_eq!(res.vm[0].power_state, PowerState::Halted);

        let e = format!("xovm --inventory {inventory} vm plan --id {} -f {spec}", fixtures::VM);
        Cli::switch(Cli::parse_from(e.split(' '))).await?;

        fs::remove_file(&inventory).into_diagnostic()?;
        fs::remove_file(&spec).into_diagnostic()?;
        Ok(())
    }
}
