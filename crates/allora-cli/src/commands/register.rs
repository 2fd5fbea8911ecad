// crates/allora-cli/src/commands/register.rs
//
// `allora register {worker, reputer, stake}`: topic membership and stake.

use clap::Subcommand;

use allora_core::{ActorId, Decimal, TopicId};

use super::Context;

/// Registration subcommands.
#[derive(Debug, Subcommand)]
pub enum RegisterCmd {
    /// Register a worker (inferer and/or forecaster) in a topic.
    Worker {
        #[arg(long)]
        topic: TopicId,
        /// Worker address.
        #[arg(long)]
        actor: String,
    },
    /// Register a reputer in a topic, optionally with its stake.
    Reputer {
        #[arg(long)]
        topic: TopicId,
        /// Reputer address.
        #[arg(long)]
        actor: String,
        /// Stake placed in the topic.
        #[arg(long)]
        stake: Option<Decimal>,
    },
    /// Set the stake of a registered reputer.
    Stake {
        #[arg(long)]
        topic: TopicId,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        amount: Decimal,
    },
}

/// Run the register subcommand.
pub fn run(ctx: &Context, cmd: &RegisterCmd) -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = ctx.load_ledger()?;
    match cmd {
        RegisterCmd::Worker { topic, actor } => {
            ledger.register_worker(*topic, ActorId::from(actor.as_str()))?;
            println!("Registered worker {} in topic {}", actor, topic);
        }
        RegisterCmd::Reputer { topic, actor, stake } => {
            let id = ActorId::from(actor.as_str());
            ledger.register_reputer(*topic, id.clone())?;
            if let Some(amount) = stake {
                ledger.set_stake(*topic, id, *amount)?;
            }
            println!("Registered reputer {} in topic {}", actor, topic);
        }
        RegisterCmd::Stake { topic, actor, amount } => {
            let id = ActorId::from(actor.as_str());
            if !ledger.topic(*topic)?.reputers.contains(&id) {
                return Err(format!("{} is not a registered reputer of topic {}", actor, topic).into());
            }
            ledger.set_stake(*topic, id, *amount)?;
            println!("Stake of {} in topic {} set to {}", actor, topic, amount);
        }
    }
    ctx.save_ledger(&ledger)?;
    Ok(())
}
