use std::time::Duration;

use argh::FromArgs;

/// Ping a Minecraft server and print its status.
#[derive(FromArgs)]
struct Args {
    /// the server address, `host` or `host:port`
    #[argh(positional)]
    address: String,
    /// query a Bedrock edition server instead of Java
    #[argh(switch, short = 'b')]
    bedrock: bool,
    /// seconds to wait for a response
    #[argh(option, short = 't', default = "5")]
    timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), piglin::Error> {
    let args: Args = argh::from_env();
    let timeout = Some(Duration::from_secs(args.timeout));

    if args.bedrock {
        let (latency, status) = piglin::tokio::get_status(piglin::Bedrock {
            server_address: args.address,
            timeout,
            ..Default::default()
        })
        .await?;

        println!("edition: {}", status.edition);
        println!("motd: {}", status.motd);
        println!(
            "version: {} (protocol {})",
            status.version_name, status.protocol_version
        );
        println!("players: {}/{}", status.players_online, status.players_max);
        println!("game mode: {}", status.game_mode);
        println!("latency: {latency}ms");
    } else {
        let (latency, status) = piglin::tokio::get_status(piglin::Java {
            server_address: args.address,
            timeout,
            ..Default::default()
        })
        .await?;

        println!(
            "version: {} (protocol {})",
            status.version.name, status.version.protocol
        );
        println!("description: {}", status.description.text());
        println!("players: {}/{}", status.players.online, status.players.max);
        println!("latency: {latency}ms");
    }

    Ok(())
}
