use crate::state::{ObservedBootDisk, ObservedDisk, ObservedNic};
use crate::xo::PowerState;

use owo_colors::OwoColorize;

pub fn display_state(state: &PowerState) -> String {
    let res = match state {
        PowerState::Running => "running".green().to_string(),
        PowerState::Halted => "halted".red().to_string(),
        PowerState::Paused => "paused".yellow().to_string(),
        PowerState::Suspended => "suspended".yellow().to_string(),
        PowerState::Other(v) => v.white().to_string(),
    };
    format!("{}", res)
}
pub fn display_boot_disk(disk: &Option<ObservedBootDisk>) -> String {
    match disk {
        Some(disk) => format!("{} ({}) on {}", disk.disk_id, disk.size, disk.storage_repository_id),
        None => "".to_owned(),
    }
}
pub fn display_disks(disks: &Vec<ObservedDisk>) -> String {
    let strs: Vec<String> = disks
        .iter()
        .map(|e| match &e.device {
            Some(device) => format!("{} -> {}", device, e.disk_id),
            None => format!("#{} -> {}", e.position, e.disk_id),
        })
        .collect();
    strs.join("\n")
}
pub fn display_nics(nics: &Vec<ObservedNic>) -> String {
    let strs: Vec<String> = nics
        .iter()
        .map(|e| {
            let network = match e.attached {
                true => e.network_id.green().to_string(),
                false => e.network_id.white().to_string(),
            };
            format!("{} -> {} ({})", e.device, network, e.mac_address)
        })
        .collect();
    strs.join("\n")
}
