use anyhow::{bail, Context as _, Result};
use pipedeck_core::models::{ArtifactFilter, NewCluster, NewHpaPolicy};
use pipedeck_core::stores::{HpaStore, PipelineStore};

use super::{print_json, print_page_footer, read_json};
use crate::cli::{ArtifactCommand, ClusterCommand, HpaCommand, SystemCommand};
use crate::context::Context;

pub async fn artifacts(ctx: &mut Context, command: ArtifactCommand) -> Result<()> {
    ctx.enter("/artifacts").await?;
    match command {
        ArtifactCommand::List {
            page,
            name,
            kind,
            pipeline,
        } => {
            let filter = ArtifactFilter {
                page: page.into(),
                name,
                kind,
                pipeline_id: pipeline,
            };
            let listing = ctx.api.list_artifacts(&filter).await?;
            println!("{:>6}  {:<32} {:<8} {:<10} {}", "ID", "NAME", "TYPE", "VERSION", "SIZE");
            for artifact in &listing.list {
                println!(
                    "{:>6}  {:<32} {:<8} {:<10} {}",
                    artifact.id,
                    artifact.name,
                    artifact.kind,
                    artifact.version,
                    artifact.size_display()
                );
            }
            print_page_footer(listing.page, listing.total_pages(), listing.total);
        }
        ArtifactCommand::Show { id } => print_json(&ctx.api.get_artifact(id).await?)?,
        ArtifactCommand::Delete { id } => {
            ctx.api.delete_artifact(id).await?;
            println!("Deleted artifact {}", id);
        }
    }
    Ok(())
}

pub async fn dashboard(ctx: &mut Context, limit: u32) -> Result<()> {
    ctx.enter("/dashboard").await?;
    let store = PipelineStore::new(ctx.api.clone());
    let (stats, activities) = store.dashboard(limit).await?;

    println!(
        "success {}  running {}  failed {}  pending {}",
        stats.success, stats.running, stats.failed, stats.pending
    );
    if let Some(rate) = stats.success_rate() {
        println!("success rate {:.1}%", rate);
    }
    if !activities.is_empty() {
        println!();
        for activity in &activities {
            let when = activity
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!("{:<16}  {}", when, activity.content);
        }
    }
    Ok(())
}

pub async fn hpa(ctx: &mut Context, command: HpaCommand) -> Result<()> {
    ctx.enter("/hpa").await?;
    let store = HpaStore::new(ctx.api.clone());
    match command {
        HpaCommand::List { page } => {
            let policies = store.fetch_policies(page.into()).await?;
            println!("{:>6}  {:<20} {:<16} {:<9} {:<5} {}", "ID", "NAME", "NAMESPACE", "REPLICAS", "CPU%", "MEM%");
            for policy in &policies {
                println!(
                    "{:>6}  {:<20} {:<16} {:<9} {:<5} {}",
                    policy.id,
                    policy.name,
                    policy.namespace,
                    format!("{}-{}", policy.min_replicas, policy.max_replicas),
                    policy.cpu_threshold,
                    policy.memory_threshold
                );
            }
        }
        HpaCommand::Create { file } => {
            let policy: NewHpaPolicy = read_json(&file)?;
            let created = store.create_policy(&policy).await?;
            println!("Created HPA policy {} in {}", created.name, created.namespace);
        }
    }
    Ok(())
}

pub async fn clusters(ctx: &mut Context, command: ClusterCommand) -> Result<()> {
    ctx.enter("/clusters").await?;
    match command {
        ClusterCommand::List => {
            for cluster in ctx.api.list_clusters().await? {
                println!("{:>6}  {}", cluster.id, cluster.name);
            }
        }
        ClusterCommand::Add {
            name,
            kubeconfig,
            description,
        } => {
            let kubeconfig = std::fs::read_to_string(&kubeconfig)
                .with_context(|| format!("Failed to read {}", kubeconfig.display()))?;
            if kubeconfig.trim().is_empty() {
                bail!("kubeconfig is empty");
            }
            let cluster = NewCluster {
                name,
                kubeconfig,
                description,
            };
            ctx.api.add_cluster(&cluster).await?;
            println!("Added cluster {}", cluster.name);
        }
    }
    Ok(())
}

pub async fn system(ctx: &mut Context, command: SystemCommand) -> Result<()> {
    match command {
        SystemCommand::Config => {
            ctx.enter("/settings").await?;
            print_json(&ctx.api.system_config().await?)
        }
        SystemCommand::Health => {
            let health = ctx.api.health().await?;
            println!("{}", health.status);
            if !health.is_ok() {
                bail!("Server reports {}", health.status);
            }
            Ok(())
        }
    }
}
