//! # Events Module
//!
//! Progress reporting for front ends.
//!
//! The analyzer emits events through a channel so the CLI (or a GUI) can
//! show what stage a document is in without the core knowing who listens.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Analysis(AnalysisEvent::StageChanged { stage }) = event {
//!             eprintln!("{stage}");
//!         }
//!     }
//! });
//!
//! analyzer.analyze_with_events(&request, &sender, &CancellationToken::new())?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
