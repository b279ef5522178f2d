use crate::reconcile::{GateDecision, UpdatePlan};

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::{settings::Style, Table, Tabled};

// Error Handling
use xovm_error::XovmError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub enum Action {
    Keep,
    Detach,
    Attach,
    Resize,
    Set,
    PowerOff,
}
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let res = match self {
            Action::Keep => "keep".white().to_string(),
            Action::Detach => "detach".red().to_string(),
            Action::Attach => "attach".green().to_string(),
            Action::Resize => "resize".yellow().to_string(),
            Action::Set => "set".blue().to_string(),
            Action::PowerOff => "power off".red().to_string(),
        };
        write!(f, "{}", res)
    }
}

/// One row per planned operation.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct PlanTable {
    pub resource: String,
    pub action: Action,
    pub target: String,
}

impl PlanTable {
    fn row(resource: &str, action: Action, target: &str) -> Self {
        Self {
            resource: resource.to_owned(),
            action,
            target: target.to_owned(),
        }
    }
    pub fn from_plan(plan: &UpdatePlan) -> Vec<Self> {
        let mut rows = vec![];
        if let Some(name) = &plan.vm_update.name {
            rows.push(Self::row("vm name", Action::Set, name));
        }
        if let Some(description) = &plan.vm_update.description {
            rows.push(Self::row("vm description", Action::Set, description));
        }
        if let GateDecision::PowerOff { force } = plan.gate {
            let target = match force {
                true => format!("{} (forced)", plan.vm_id),
                false => plan.vm_id.clone(),
            };
            rows.push(Self::row("vm", Action::PowerOff, &target));
        }
        if let Some(resize) = &plan.boot_resize {
            let target = format!("{} {} -> {}", resize.disk_id, resize.from, resize.to);
            rows.push(Self::row("boot disk", Action::Resize, &target));
        }
        for id in &plan.disks.keep {
            rows.push(Self::row("disk", Action::Keep, id));
        }
        for e in &plan.disks.detach_delete {
            rows.push(Self::row("disk", Action::Detach, &e.id));
        }
        for e in &plan.disks.attach {
            rows.push(Self::row("disk", Action::Attach, &e.disk_id));
        }
        for id in &plan.networks.keep {
            rows.push(Self::row("network", Action::Keep, id));
        }
        for e in &plan.networks.detach_delete {
            rows.push(Self::row("network", Action::Detach, &e.id));
        }
        for e in &plan.networks.attach {
            rows.push(Self::row("network", Action::Attach, &e.network_id));
        }
        rows
    }
    pub fn display(items: Vec<Self>) -> Result<(), XovmError> {
        let mut res = Table::new(&items);
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{fixtures, Reconciler};
    use crate::repository::MemoryRepository;
    use crate::state::NetworkRef;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn rows_follow_the_plan() -> Result<()> {
        let repo = MemoryRepository::new(fixtures::inventory());
        let mut desired = fixtures::spec();
        desired.allow_stopping_for_update = true;
        desired.network_interfaces = vec![NetworkRef {
            network_id: fixtures::NET_B.to_owned(),
        }];
        let plan = Reconciler::new(&repo)
            .plan_update(fixtures::VM, None, &desired)
            .await?
            .ok_or_else(|| miette::miette!("vm should exist"))?;

        let rows = PlanTable::from_plan(&plan);
        let actions: Vec<(&str, Action)> =
            rows.iter().map(|e| (e.resource.as_str(), e.action)).collect();
        assert_eq!(
            actions,
            vec![
                ("vm", Action::PowerOff),
                ("network", Action::Detach),
                ("network", Action::Attach)
            ]
        );
        PlanTable::display(rows)?;
        Ok(())
    }
}
