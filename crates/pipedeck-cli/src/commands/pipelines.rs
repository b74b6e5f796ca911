use anyhow::{bail, Result};
use pipedeck_core::models::{NewPipeline, PipelineUpdate, TriggerRequest};
use pipedeck_core::stores::PipelineStore;

use super::{print_json, print_page_footer, read_json};
use crate::cli::PipelineCommand;
use crate::context::Context;

/// Page the CLI command corresponds to, for the auth gate.
fn route_for(command: &PipelineCommand) -> String {
    match command {
        PipelineCommand::List { .. } | PipelineCommand::Delete { .. } => "/pipelines".to_string(),
        PipelineCommand::Create { .. } => "/pipelines/create".to_string(),
        PipelineCommand::Update { id, .. } => format!("/pipelines/{}/edit", id),
        PipelineCommand::Show { id } | PipelineCommand::Trigger { id, .. } => {
            format!("/pipelines/{}", id)
        }
        PipelineCommand::Runs { .. }
        | PipelineCommand::Run { .. }
        | PipelineCommand::Logs { .. }
        | PipelineCommand::Cancel { .. } => "/builds/history".to_string(),
    }
}

pub async fn run(ctx: &mut Context, command: PipelineCommand) -> Result<()> {
    ctx.enter(&route_for(&command)).await?;
    let store = PipelineStore::new(ctx.api.clone());

    match command {
        PipelineCommand::List { page } => {
            let listing = store.fetch_pipelines(page.into()).await?;
            if listing.list.is_empty() {
                println!("No pipelines");
                return Ok(());
            }
            println!("{:>6}  {:<28} {:<10} {:<18} {}", "ID", "NAME", "STATUS", "LAST RUN", "BRANCH");
            for pipeline in &listing.list {
                println!(
                    "{:>6}  {:<28} {:<10} {:<18} {}",
                    pipeline.id,
                    pipeline.name,
                    pipeline.status.to_string(),
                    pipeline.last_run_display(),
                    pipeline.git_branch
                );
            }
            print_page_footer(listing.page, listing.total_pages(), listing.total);
        }
        PipelineCommand::Show { id } => print_json(&store.fetch_pipeline(id).await?)?,
        PipelineCommand::Create { file } => {
            let definition: NewPipeline = read_json(&file)?;
            if let Err(message) = definition.validate() {
                bail!("Invalid pipeline definition: {}", message);
            }
            let created = store.create_pipeline(&definition).await?;
            println!("Created pipeline {} ({} jobs)", created.id, created.job_count());
        }
        PipelineCommand::Update { id, file } => {
            let update: PipelineUpdate = read_json(&file)?;
            let updated = store.update_pipeline(id, &update).await?;
            println!("Updated pipeline {} ({})", updated.id, updated.name);
        }
        PipelineCommand::Delete { id } => {
            store.delete_pipeline(id).await?;
            println!("Deleted pipeline {}", id);
        }
        PipelineCommand::Trigger { id, branch } => {
            let trigger = TriggerRequest { git_branch: branch };
            match store.trigger_pipeline(id, &trigger).await? {
                Some(run) => println!("Started run {} ({})", run.id, run.status),
                None => println!("Pipeline {} triggered", id),
            }
        }
        PipelineCommand::Runs { id, page } => {
            let runs = ctx.api.list_runs(id, page.into()).await?;
            println!("{:>6}  {:<10} {:<16} {:<10} {}", "RUN", "STATUS", "BRANCH", "COMMIT", "DURATION");
            for run in &runs.list {
                println!(
                    "{:>6}  {:<10} {:<16} {:<10} {}",
                    run.id,
                    run.status.to_string(),
                    run.git_branch,
                    run.short_commit(),
                    run.duration_display()
                );
            }
            print_page_footer(runs.page, runs.total_pages(), runs.total);
        }
        PipelineCommand::Run { id, run_id } => print_json(&ctx.api.get_run(id, run_id).await?)?,
        PipelineCommand::Logs { id, run_id } => {
            print!("{}", ctx.api.run_logs(id, run_id).await?);
        }
        PipelineCommand::Cancel { id, run_id } => {
            ctx.api.cancel_run(id, run_id).await?;
            println!("Cancelled run {} of pipeline {}", run_id, id);
        }
    }
    Ok(())
}
