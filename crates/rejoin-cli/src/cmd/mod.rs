pub mod apply;
pub mod completions;
pub mod config;
pub mod fix;
pub mod scan;

use std::path::Path;

use rejoin_core::{Config, Editor, RejoinError};

use crate::output::{CliError, OutputMode, render_error};

/// Render a core error in the active output mode and hand it back for `?`.
pub fn report(output: OutputMode, err: RejoinError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        return render_err;
    }
    anyhow::Error::new(err)
}

/// Extract and index `epub`, reporting load failures.
pub fn load_editor(epub: &Path, config: &Config, output: OutputMode) -> anyhow::Result<Editor> {
    Editor::load(epub, config).map_err(|err| report(output, err))
}
