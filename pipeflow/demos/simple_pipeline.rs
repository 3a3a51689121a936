//! Loads `simple_pipeline.json` and runs it against two requests.
//!
//! ```text
//! cargo run --example simple_pipeline [path/to/pipeline.json]
//! ```

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use pipeflow::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ValidateIdParams {
    #[serde(rename = "minID", default)]
    min_id: u64,
}

/// Rejects requests whose `id` is missing or below `min_id`.
#[derive(Debug)]
struct ValidateId {
    min_id: u64,
}

#[async_trait]
impl Component for ValidateId {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        let id = ctx
            .request()
            .get("id")
            .and_then(serde_json::Value::as_u64)
            .context("request has no numeric id")?;
        if id < self.min_id {
            bail!("id {id} is below the minimum {}", self.min_id);
        }
        ctx.params.set("id", json!(id));
        Ok(())
    }
}

/// Rejects requests without a non-empty `name`.
#[derive(Debug)]
struct ValidateName;

#[async_trait]
impl Component for ValidateName {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        let name = ctx
            .request()
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if name.trim().is_empty() {
            bail!("name must not be empty");
        }
        ctx.params.set("name", json!(name));
        Ok(())
    }
}

/// Publishes the user record on the data bus.
#[derive(Debug)]
struct LoadUserData;

#[async_trait]
impl Component for LoadUserData {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        let id = ctx.params.get("id").context("id was not validated")?;
        let name = ctx.params.get("name").context("name was not validated")?;
        ctx.data.set("user", json!({"id": id, "name": name}));
        Ok(())
    }
}

/// Publishes the user's permissions on the data bus.
#[derive(Debug)]
struct LoadUserPermissions;

#[async_trait]
impl Component for LoadUserPermissions {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        // Runs beside LoadUserData, so it keys off the validated id rather
        // than the user record.
        let id: u64 = ctx.params.get_as("id").context("id was not validated")?;
        let permissions = if id == 1 {
            json!(["read", "write", "admin"])
        } else {
            json!(["read"])
        };
        ctx.data.set("permissions", permissions);
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProcessUserParams {
    #[serde(default)]
    debug: bool,
}

/// Combines the loaded data into the run's result.
#[derive(Debug)]
struct ProcessUser {
    debug: bool,
}

#[async_trait]
impl Component for ProcessUser {
    async fn execute(&self, ctx: &Context) -> ComponentResult {
        let user = ctx.data.get("user").context("user was not loaded")?;
        let permissions = ctx.data.get("permissions").unwrap_or_else(|| json!([]));
        if self.debug {
            tracing::debug!(user = %user, permissions = %permissions, "Processing user");
        }
        ctx.set_result(json!({"user": user, "permissions": permissions, "processed": true}));
        Ok(())
    }
}

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register_typed("ValidateID", |p: ValidateIdParams| ValidateId { min_id: p.min_id })
        .register("ValidateName", |_| Ok(Arc::new(ValidateName)))
        .register("LoadUserData", |_| Ok(Arc::new(LoadUserData)))
        .register("LoadUserPermissions", |_| Ok(Arc::new(LoadUserPermissions)))
        .register_typed("ProcessUser", |p: ProcessUserParams| ProcessUser { debug: p.debug });
    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&LoggingConfig::default().with_level("info,pipeflow=debug"))?;

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/demos/simple_pipeline.json").to_string()
    });
    let pipeline = PipelineConfig::from_file(&path)?.build(&registry())?;

    let shutdown = CancellationToken::new();
    for request in [json!({"id": 1, "name": "Ada"}), json!({"id": 0, "name": "Nobody"})] {
        let ctx = Arc::new(
            Context::new(&shutdown, request.clone())
                .with_event_sink(Arc::new(LoggingEventSink::debug())),
        );

        match pipeline.execute(&ctx).await {
            Ok(()) => println!("{request} -> {}", ctx.result().unwrap_or_default()),
            Err(err) => {
                println!("{request} -> failed: {err}");
                for recorded in ctx.errors() {
                    println!("  recorded: {recorded}");
                }
            }
        }
    }

    Ok(())
}
