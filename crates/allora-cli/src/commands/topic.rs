// crates/allora-cli/src/commands/topic.rs
//
// `allora topic {create, update, show, list}`: topic lifecycle and parameters.

use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use allora_core::{TopicId, TopicParams};

use super::Context;
use crate::config::expand_tilde;
use crate::output::emit;

/// Topic subcommands.
#[derive(Debug, Subcommand)]
pub enum TopicCmd {
    /// Create a topic, using the config's default parameters unless a file is given.
    Create {
        /// Topic id.
        #[arg(long)]
        id: TopicId,
        /// TOML file of topic parameters; missing fields take defaults.
        #[arg(long)]
        params: Option<String>,
    },
    /// Replace a topic's parameters.
    Update {
        #[arg(long)]
        id: TopicId,
        #[arg(long)]
        params: String,
    },
    /// Show a topic's parameters and participants.
    Show {
        #[arg(long)]
        id: TopicId,
    },
    /// List all topics.
    List,
}

#[derive(Tabled, Serialize)]
struct TopicRow {
    #[tabled(rename = "Topic")]
    topic_id: TopicId,
    #[tabled(rename = "Workers")]
    workers: usize,
    #[tabled(rename = "Reputers")]
    reputers: usize,
    #[tabled(rename = "Inference Bundles")]
    inference_bundles: usize,
    #[tabled(rename = "Loss Bundles")]
    loss_bundles: usize,
    #[tabled(rename = "Latest Loss Block")]
    latest_loss_block: String,
}

#[derive(Tabled, Serialize)]
struct ParamRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn read_params(path: &str) -> Result<TopicParams, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(expand_tilde(path))
        .map_err(|e| format!("Could not read {}: {}", path, e))?;
    let params: TopicParams = toml::from_str(&contents)?;
    Ok(params)
}

fn param_rows(params: &TopicParams) -> Vec<ParamRow> {
    let row = |name: &str, value: String| ParamRow {
        name: name.to_string(),
        value,
    };
    vec![
        row("epsilon", params.epsilon.to_string()),
        row("p_norm", params.p_norm.to_string()),
        row("alpha_regret", params.alpha_regret.to_string()),
        row("alpha_score", params.alpha_score.to_string()),
        row("active_quantile", params.active_quantile.to_string()),
        row("max_top_actors", params.max_top_actors.to_string()),
        row("top_n_strategy", format!("{:?}", params.top_n_strategy)),
    ]
}

/// Run the topic subcommand.
pub fn run(ctx: &Context, cmd: &TopicCmd) -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = ctx.load_ledger()?;
    match cmd {
        TopicCmd::Create { id, params } => {
            let params = match params {
                Some(path) => read_params(path)?,
                None => ctx.config.default_topic.clone(),
            };
            ledger.create_topic(*id, params)?;
            ctx.save_ledger(&ledger)?;
            tracing::info!("Created topic {}", id);
            println!("Created topic {}", id);
        }
        TopicCmd::Update { id, params } => {
            ledger.update_params(*id, read_params(params)?)?;
            ctx.save_ledger(&ledger)?;
            tracing::info!("Updated parameters of topic {}", id);
            println!("Updated topic {}", id);
        }
        TopicCmd::Show { id } => {
            let state = ledger.topic(*id)?;
            emit(ctx.format, &param_rows(&state.params), state);
        }
        TopicCmd::List => {
            let mut rows = Vec::new();
            for topic_id in ledger.topic_ids() {
                let state = ledger.topic(topic_id)?;
                rows.push(TopicRow {
                    topic_id,
                    workers: state.workers.len(),
                    reputers: state.reputers.len(),
                    inference_bundles: state.network_inference_bundles.len(),
                    loss_bundles: state.network_loss_bundles.len(),
                    latest_loss_block: state
                        .network_loss_bundles
                        .keys()
                        .next_back()
                        .map(|b| b.to_string())
                        .unwrap_or_else(|| "--".to_string()),
                });
            }
            emit(ctx.format, &rows, &rows);
        }
    }
    Ok(())
}
