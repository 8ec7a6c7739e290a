pub mod identity;
pub mod play;

pub use identity::{show_identity, IdentityArgs};
pub use play::{play, PlayArgs};

use clap::Args;
use coinflip_core::LaunchContext;

/// Flags that stand in for the embedding platform and launch URL.
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
    /// Room to join (overrides the launch URL)
    #[arg(short, long)]
    pub room: Option<String>,

    /// Player id as the embedding platform would supply it
    #[arg(short, long)]
    pub player_id: Option<String>,

    /// Launch URL whose query string is read for `room`
    #[arg(long)]
    pub launch_url: Option<String>,
}

impl LaunchArgs {
    /// Environment first, flags on top
    pub fn context(&self) -> LaunchContext {
        let mut context = LaunchContext::from_env();

        if let Some(player_id) = &self.player_id {
            context = context.with_user_id(player_id.clone());
        }
        if let Some(room) = &self.room {
            context = context.with_room(room.clone());
        }
        if let Some(launch_url) = &self.launch_url {
            context = context.with_launch_url(launch_url);
        }

        context
    }
}
