// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! `ps` projection: flatten one compose project's containers into rows
//! sorted by `(service, name)` (spec §4.2).

use hack_core::RuntimeProject;

#[derive(Debug, Clone, PartialEq)]
pub struct PsRow {
    pub service: String,
    pub name: String,
    pub status: String,
    pub ports: Vec<String>,
}

pub fn ps_payload(runtime_snapshot: &[RuntimeProject], compose_project: &str) -> Vec<PsRow> {
    let Some(project) = runtime_snapshot.iter().find(|rp| rp.compose_project == compose_project) else {
        return Vec::new();
    };
    let mut rows: Vec<PsRow> = project
        .services
        .iter()
        .flat_map(|(service, containers)| {
            containers.iter().map(move |c| PsRow {
                service: service.clone(),
                name: c.name.clone(),
                status: c.status.clone(),
                ports: c.ports.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| (&a.service, &a.name).cmp(&(&b.service, &b.name)));
    rows
}
