//! `sdgflow reset`: delete a saved session.

use super::open_workspace;
use crate::cli::ResetArgs;
use crate::error::Result;
use crate::events::{self, Event, EventAction};
use serde_json::json;
use std::path::Path;

pub fn cmd_reset(dir: Option<&Path>, args: ResetArgs) -> Result<()> {
    let workspace = open_workspace(dir)?;
    let _lock = workspace.lock(&args.session, "reset")?;

    let removed = workspace.store().remove(&args.session)?;
    events::record(
        &workspace.ctx,
        &Event::new(EventAction::Reset)
            .with_session(&args.session)
            .with_details(json!({ "removed": removed })),
    );

    if removed {
        println!("Session '{}' deleted.", args.session);
    } else {
        println!("No saved session '{}'; nothing to do.", args.session);
    }
    Ok(())
}
