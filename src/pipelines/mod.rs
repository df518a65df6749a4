// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for still capture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Photo Output │ ──▶ │  Photo Pipeline   │ ──▶ │ Photo Library│
//! │ (JPEG / raw) │     │  - JPEG decode    │     │  (files)     │
//! │              │     │  - failure report │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! Decoding runs on a blocking task and saving is fire-and-forget, so the
//! session is free for the next capture as soon as a result arrives.

pub mod photo;
