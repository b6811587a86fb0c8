use clap::Subcommand;
use loopfocus_core::MediaId;

#[derive(Subcommand)]
pub enum MediaAction {
    /// Extract the video id from a link
    Parse {
        /// Video URL or id
        url: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: MediaAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MediaAction::Parse { url, json } => {
            let id = MediaId::parse(&url)?;
            if json {
                let value = serde_json::json!({
                    "id": id.as_str(),
                    "watch_url": id.watch_url(),
                    "thumbnail_url": id.thumbnail_url(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{id}");
            }
        }
    }
    Ok(())
}
