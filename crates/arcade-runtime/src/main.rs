//! Arcade runtime entry point: runs one lobby from creation to game start
//! and logs the resulting state.

use std::error::Error;

use arcade_lobby::application::command_handlers::{
    handle_create_lobby, handle_join_lobby, handle_start_game,
};
use arcade_lobby::application::query_handlers::get_lobby;
use arcade_lobby::domain::commands::{CreateLobby, JoinLobby, StartGame};
use arcade_runtime::telemetry::init_tracing;
use arcade_runtime::{Runtime, RuntimeConfig};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = RuntimeConfig::from_env()?;
    init_tracing(&config);

    let runtime = Runtime::new(config)?;
    let ports = runtime.ports();

    let created = handle_create_lobby(
        &CreateLobby {
            correlation_id: Uuid::new_v4(),
            lobby_id: None,
            name: "Demo lobby".to_owned(),
            host_id: "host".to_owned(),
            max_players: None,
        },
        ports,
    )
    .await?;
    tracing::info!(lobby_id = %created.lobby_id, "lobby created");

    for player_id in ["guest-1", "guest-2"] {
        let joined = handle_join_lobby(
            &JoinLobby {
                correlation_id: Uuid::new_v4(),
                lobby_id: created.lobby_id.clone(),
                player_id: player_id.to_owned(),
            },
            ports,
        )
        .await?;
        tracing::info!(player_id, status = %joined.status, "player joined");
    }
    tracing::info!(open_lobbies = runtime.directory().len(), "directory updated");

    handle_start_game(
        &StartGame {
            correlation_id: Uuid::new_v4(),
            lobby_id: created.lobby_id.clone(),
            requested_by: "host".to_owned(),
        },
        ports,
    )
    .await?;

    let view = get_lobby(&created.lobby_id, ports).await?;
    tracing::info!(
        lobby = %serde_json::to_string(&view)?,
        open_lobbies = runtime.directory().len(),
        bus = ?runtime.bus().stats(),
        "game started"
    );

    Ok(())
}
