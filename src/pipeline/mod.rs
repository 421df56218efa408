//! Pipeline stages for transcript analysis.
//!
//! Each submodule implements exactly one step. Only [`extract`] can fail;
//! every later stage works on already-extracted text and is infallible,
//! producing empty results when it finds nothing.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ detect ──────────────┐
//! (Document) (text+name) (keyword, pattern)   │
//!                  │                          ▼
//!                  ├──▶ signals ──▶ classify ──▶ analyze ◀── synthesize
//!                  └──▶ courses ───────────────▶ (outcome)
//! ```
//!
//! 1. [`input`]   — the document handle and its kind (text, PDF, binary)
//! 2. [`extract`] — decode the text layer, append the file name; PDF work
//!    runs in `spawn_blocking` because pdfium is not async-aware
//! 3. [`detect`]  — first-match-wins institution detection over the catalog
//! 4. [`signals`] — numeric grade points and letter grades
//! 5. [`classify`] — scale family from grade-point fingerprints
//! 6. [`courses`] — best-effort course lines
//! 7. [`synthesize`] — custom letter → point scale from observed points

pub mod classify;
pub mod courses;
pub mod detect;
pub mod extract;
pub mod input;
pub mod signals;
pub mod synthesize;
