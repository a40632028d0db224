//! Show the rich cards a deck would produce.

use std::path::PathBuf;

use slidecast_deck_model::{deck_directory, rich_cards, DeckParser, ManifestDeckParser};

pub async fn run(deck: PathBuf, manifest: Option<PathBuf>) -> anyhow::Result<()> {
    let parser = match manifest {
        Some(path) => ManifestDeckParser::with_manifest(path),
        None => ManifestDeckParser::new(),
    };

    let slides = parser
        .extract_all_slides(&deck)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse deck: {e:#}"))?;
    let cards = rich_cards(&slides, &deck_directory(&deck));

    let missing = cards.iter().filter(|card| !card.image.exists()).count();
    if missing > 0 {
        tracing::warn!(missing, "Some slide images do not exist");
    }

    println!("{}", serde_json::to_string_pretty(&cards)?);
    Ok(())
}
