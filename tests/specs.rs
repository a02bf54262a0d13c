// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! End-to-end specs driven against a real `hackd` subprocess (spec §8).
//!
//! Per-crate unit tests already cover the invariants that don't need a live
//! process — registry concurrency (S1, `hack-registry`), ticket dedupe (S6,
//! `hack-tickets`), runtime fingerprint resets (S5, `hack-runtime`). What
//! belongs here is the behavior that only exists once the socket, the
//! gateway, and the supervisor are wired together by `Router` and running
//! in a real process: job completion and cancellation over the socket (S2,
//! S3, scoped to status/exit-code rather than a full WS event replay — that
//! replay-correctness invariant is covered at the bus level in
//! `hack-supervisor`), and the gateway's auth/writes-disabled/success
//! three-way (S4).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod support;

use std::collections::HashMap;

use hack_core::{JobStatus, Scope};
use hack_wire::{Request, Response};

use support::{wait_for, TestDaemon, WAIT_MAX};

#[tokio::test]
async fn status_round_trips_over_the_control_socket() {
    let daemon = TestDaemon::spawn(true).await;
    match daemon.send(&Request::Status).await {
        Response::Status { status, .. } => assert_eq!(status, "running"),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn registering_a_project_makes_it_listable() {
    let daemon = TestDaemon::spawn(true).await;
    let repo_root = daemon.paths.root().join("repo");
    std::fs::create_dir_all(&repo_root).expect("make repo dir");

    let register = Request::RegisterProject {
        name: "widgets".to_string(),
        dev_host: "widgets.local".to_string(),
        repo_root: repo_root.display().to_string(),
        config_dir: repo_root.join(".hack").display().to_string(),
    };
    let registered_id = match daemon.send(&register).await {
        Response::ProjectRegistered { project } => project.id,
        other => panic!("unexpected response: {:?}", other),
    };

    let list = Request::ListProjects { filter: None, include_global: true, include_unregistered: false };
    match daemon.send(&list).await {
        Response::Projects { projects } => {
            assert!(projects.iter().any(|p| p.id == registered_id), "registered project should be listed");
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn a_job_completes_and_is_observable_through_get_job() {
    let daemon = TestDaemon::spawn(true).await;
    let repo_root = daemon.paths.root().join("repo");
    std::fs::create_dir_all(&repo_root).expect("make repo dir");

    let project_id = match daemon
        .send(&Request::RegisterProject {
            name: "echoer".to_string(),
            dev_host: "echoer.local".to_string(),
            repo_root: repo_root.display().to_string(),
            config_dir: repo_root.join(".hack").display().to_string(),
        })
        .await
    {
        Response::ProjectRegistered { project } => project.id,
        other => panic!("unexpected response: {:?}", other),
    };
    let project_id = hack_core::ProjectId::from_string(project_id);

    let job_id = match daemon
        .send(&Request::CreateJob {
            project_id: project_id.clone(),
            runner: "/bin/echo".to_string(),
            command: vec!["hello-from-spec".to_string()],
            working_dir: repo_root.display().to_string(),
            env: HashMap::new(),
        })
        .await
    {
        Response::Job { job } => job.id,
        other => panic!("unexpected response: {:?}", other),
    };

    let terminal = wait_for(WAIT_MAX, || async {
        let request = Request::GetJob { project_id: project_id.clone(), job_id: job_id.clone() };
        matches!(
            daemon.send(&request).await,
            Response::Job { job } if job.status != JobStatus::Queued && job.status != JobStatus::Running
        )
    })
    .await;
    assert!(terminal, "job should reach a terminal status within the deadline");

    match daemon.send(&Request::GetJob { project_id, job_id }).await {
        Response::Job { job } => {
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.exit_code, Some(0));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn cancelling_a_running_job_reaches_canceled_within_six_seconds() {
    let daemon = TestDaemon::spawn(true).await;
    let repo_root = daemon.paths.root().join("repo");
    std::fs::create_dir_all(&repo_root).expect("make repo dir");

    let project_id = match daemon
        .send(&Request::RegisterProject {
            name: "sleeper".to_string(),
            dev_host: "sleeper.local".to_string(),
            repo_root: repo_root.display().to_string(),
            config_dir: repo_root.join(".hack").display().to_string(),
        })
        .await
    {
        Response::ProjectRegistered { project } => project.id,
        other => panic!("unexpected response: {:?}", other),
    };
    let project_id = hack_core::ProjectId::from_string(project_id);

    let job_id = match daemon
        .send(&Request::CreateJob {
            project_id: project_id.clone(),
            runner: "/bin/sleep".to_string(),
            command: vec!["30".to_string()],
            working_dir: repo_root.display().to_string(),
            env: HashMap::new(),
        })
        .await
    {
        Response::Job { job } => job.id,
        other => panic!("unexpected response: {:?}", other),
    };

    // Give the worker a moment to actually exec the sleep before canceling it.
    let running = wait_for(WAIT_MAX, || async {
        let request = Request::GetJob { project_id: project_id.clone(), job_id: job_id.clone() };
        matches!(daemon.send(&request).await, Response::Job { job } if job.status == JobStatus::Running)
    })
    .await;
    assert!(running, "job should start running before it can be canceled");

    let cancel_deadline = std::time::Duration::from_secs(6);
    let started = std::time::Instant::now();
    match daemon.send(&Request::CancelJob { project_id: project_id.clone(), job_id: job_id.clone() }).await {
        Response::JobCancelRequested { .. } => {}
        other => panic!("unexpected response: {:?}", other),
    }

    let canceled = wait_for(cancel_deadline, || async {
        let request = Request::GetJob { project_id: project_id.clone(), job_id: job_id.clone() };
        matches!(daemon.send(&request).await, Response::Job { job } if job.status == JobStatus::Canceled)
    })
    .await;
    assert!(canceled, "job should reach canceled status");
    assert!(started.elapsed() < cancel_deadline, "cancellation should complete well within the deadline");
}

#[tokio::test]
async fn gateway_status_is_reachable_without_a_token() {
    let daemon = TestDaemon::spawn(true).await;
    let client = reqwest::Client::new();
    let resp = client.get(daemon.gateway_url("/v1/status")).send().await.expect("request should complete");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn gateway_mutation_without_a_token_is_unauthenticated() {
    let daemon = TestDaemon::spawn(true).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(daemon.gateway_url("/v1/projects/prune"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gateway_mutation_with_a_read_scope_token_needs_write_scope() {
    let daemon = TestDaemon::spawn(true).await;
    let (id, secret) = daemon.mint_token(Scope::Read);
    let client = reqwest::Client::new();
    let resp = client
        .post(daemon.gateway_url("/v1/projects/prune"))
        .bearer_auth(format!("{id}.{secret}"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gateway_mutation_is_rejected_when_writes_are_disabled_regardless_of_scope() {
    let daemon = TestDaemon::spawn(false).await;
    let (id, secret) = daemon.mint_token(Scope::Write);
    let client = reqwest::Client::new();
    let resp = client
        .post(daemon.gateway_url("/v1/projects/prune"))
        .bearer_auth(format!("{id}.{secret}"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gateway_mutation_with_a_write_scope_token_succeeds_once_writes_are_enabled() {
    let daemon = TestDaemon::spawn(true).await;
    let (id, secret) = daemon.mint_token(Scope::Write);
    let client = reqwest::Client::new();
    let resp = client
        .post(daemon.gateway_url("/v1/projects/prune"))
        .bearer_auth(format!("{id}.{secret}"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
}
