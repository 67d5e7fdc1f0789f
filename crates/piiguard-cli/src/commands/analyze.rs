use std::path::PathBuf;

use anyhow::{Result, bail};
use piiguard_config::Config;
use piiguard_core::render::render_result;
use piiguard_core::{OperationState, SelectedFile};

pub async fn handle(
    config: &Config,
    path: PathBuf,
    save_redacted: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let file = SelectedFile::from_path(&path, config.selection.max_bytes).await?;
    let is_image = file.is_image();
    let mut orchestrator = super::build_orchestrator(config)?;

    let state = orchestrator.analyze(file).await;

    if state == OperationState::Failed {
        let notice = orchestrator.take_notice();
        orchestrator.teardown();
        match notice {
            Some(notice) => {
                eprintln!("✗ {}", notice.message);
                bail!(notice.detail);
            }
            None => bail!("analysis failed"),
        }
    }

    let Some(result) = orchestrator.result() else {
        bail!("analysis finished without a result");
    };

    if json {
        let output = serde_json::json!({
            "state": state,
            "result": result,
            "redacted_image": result.redacted_image,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render_result(result));
    }

    if let Some(dest) = save_redacted {
        if super::save_redacted(&orchestrator, &dest).await? {
            println!("✓ Saved redacted image to {}", dest.display());
        } else if is_image {
            println!("No redacted image available.");
        } else {
            println!("Redacted images are only produced for image files.");
        }
    }

    orchestrator.teardown();
    Ok(())
}
