//! # face_arcade
//!
//! Two small arcade games steered by the camera: open your mouth (or smile)
//! and the runner jumps.
//!
//! ## Pipeline
//!
//! ```text
//! FrameSource ─► capture thread ─► CameraHandle ─► VisionSession ─► Fire
//!                                                                    │
//! window keys / clicks ─► translate() ─► Command ──────────────────► Engine::act
//! ```
//!
//! The capture thread hands over at most one pending frame; the app always
//! processes the newest.  A `Fire` from the session and a Space press reach
//! the engine through the same `Action::Jump`.
//!
//! ## Feature flags
//!
//! * (default): **Synthetic camera**. A cartoon face posed from the keyboard,
//!   plus a simulated blend-shape detector.
//! * `webcam`: **Hardware camera** through OpenCV.  No face detector ships
//!   with it, so the detector engine falls back to the pixel heuristic.
//!
//! ### Keys
//!
//! | Key | Action |
//! |---|---|
//! | `Space` / `Up` / click | Jump (runner), restart after game over |
//! | click | Move target (survivor) |
//! | `P` | Pause (survivor) |
//! | `O` hold | Open the synthetic mouth |
//! | `S` hold | Make the synthetic face smile |
//! | `F` | Hide / show the synthetic face |
//! | `V` | Camera on / off |
//! | `C` | Calibrate the threshold on a neutral face |
//! | `M` | Toggle mouth-open / smile detection |
//! | `E` | Toggle heuristic / detector engine |
//! | `-` `=` | Threshold ∓ 0.01 |
//! | `[` `]` | Sustain ∓ 20 ms |
//! | `,` `.` | Cooldown ∓ 50 ms |
//! | `Q` / `Escape` | Quit |

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod render;
pub mod visualizer;
