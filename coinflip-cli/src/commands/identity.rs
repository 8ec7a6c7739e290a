use super::LaunchArgs;
use clap::Args;
use coinflip_core::{identity, GameConfig, IdentitySource};
use comfy_table::{presets::UTF8_FULL, Table};

#[derive(Args, Debug)]
pub struct IdentityArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,
}

pub fn show_identity(args: IdentityArgs, config: &GameConfig) -> anyhow::Result<()> {
    let context = args.launch.context();
    let resolved = identity::resolve(&context, &config.default_room);

    let player_source = match resolved.source {
        IdentitySource::Platform => "platform",
        IdentitySource::Generated => "generated (new every launch)",
    };
    let room_source = if resolved.room_defaulted {
        "default"
    } else {
        "launch parameter"
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value", "Source"]);
    table.add_row(vec!["Player ID", resolved.player_id.as_str(), player_source]);
    table.add_row(vec!["Room", resolved.room.as_str(), room_source]);

    println!("{}", table);
    println!("Coordinator: {}", config.server_url);

    Ok(())
}
