//! # authscan CLI
//!
//! Command-line interface for the document authenticity scanner.
//!
//! ## Usage
//! ```bash
//! authscan analyze scan.pdf --verbose
//! authscan analyze photo.jpg --output json
//! authscan serve --port 8000
//! ```

mod cli;

use authenticity_scanner::Result;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    authenticity_scanner::init_tracing();
    cli::run()
}
