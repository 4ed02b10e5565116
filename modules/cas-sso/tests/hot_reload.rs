//! Integration tests for configuration hot reload.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use cas_sso::CasSsoPlugin;
use plugin_api::RouterPlugin;
use serde_json::json;

use common::{CAS_URL, MODEL, POLICY, POLICY_V2, config, downstream, run, session, static_factory};

fn plugin_config_value(policy: &str) -> serde_json::Value {
    json!({
        "url": CAS_URL,
        "casbin": { "model": MODEL, "policy": policy, "subject_attr": "" }
    })
}

#[tokio::test]
async fn update_switches_to_the_new_configuration() {
    let plugin = CasSsoPlugin::with_client_factory(
        config(CAS_URL, MODEL, POLICY, ""),
        static_factory(Some(session("alice", &[]))),
    )
    .await;

    assert_eq!(run(&plugin, downstream()).await.status(), StatusCode::OK);

    // policy_v2 only allows bob; alice must now be denied.
    plugin
        .update(plugin_config_value(POLICY_V2))
        .await
        .unwrap();

    assert_eq!(
        run(&plugin, downstream()).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(plugin.config().casbin.policy, POLICY_V2);
}

#[tokio::test]
async fn malformed_update_keeps_the_previous_configuration() {
    let plugin = CasSsoPlugin::with_client_factory(
        config(CAS_URL, MODEL, POLICY, ""),
        static_factory(Some(session("alice", &[]))),
    )
    .await;

    let result = plugin.update(json!({ "url": 5 })).await;
    assert!(result.is_err());

    assert_eq!(run(&plugin, downstream()).await.status(), StatusCode::OK);
    assert_eq!(plugin.config().casbin.policy, POLICY);
}

#[tokio::test]
async fn update_to_a_bad_url_moves_to_the_failed_state() {
    let plugin = CasSsoPlugin::with_client_factory(
        config(CAS_URL, MODEL, POLICY, ""),
        static_factory(Some(session("alice", &[]))),
    )
    .await;

    plugin
        .update(json!({ "url": "not a url", "casbin": {} }))
        .await
        .unwrap();

    assert_eq!(
        run(&plugin, downstream()).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_see_a_consistent_pipeline() {
    let plugin = Arc::new(
        CasSsoPlugin::with_client_factory(
            config(CAS_URL, MODEL, POLICY, ""),
            static_factory(Some(session("alice", &[]))),
        )
        .await,
    );

    let mut workers = Vec::new();
    for _ in 0..4 {
        let plugin = Arc::clone(&plugin);
        workers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let status = run(&plugin, downstream()).await.status();
                // Either the old pipeline (alice allowed) or the new one
                // (alice denied), never a half-built state answering with
                // 401/500.
                assert!(
                    status == StatusCode::OK || status == StatusCode::FORBIDDEN,
                    "unexpected status {status}"
                );
            }
        }));
    }

    for round in 0..10 {
        let policy = if round % 2 == 0 { POLICY_V2 } else { POLICY };
        plugin.update(plugin_config_value(policy)).await.unwrap();
    }

    for worker in workers {
        worker.await.unwrap();
    }
}
