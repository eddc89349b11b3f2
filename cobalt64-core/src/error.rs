// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fmt;

/// Failure classes surfaced at operation boundaries. Inner emulation steps
/// cannot fail; errors originate from command application, snapshot handling
/// and media operations only.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Invalid option value or unsupported option combination. The offending
    /// command has no effect.
    Config(String),
    /// Snapshot version mismatch or corrupted data. Loads abort atomically.
    Snapshot(String),
    /// Media operation failure. Emulation continues unaffected.
    Media(String),
    /// Runtime hardware condition that stops execution (CPU jam, invariant
    /// violation).
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Snapshot(msg) => write!(f, "snapshot error: {}", msg),
            Error::Media(msg) => write!(f, "media error: {}", msg),
            Error::Runtime(msg) => write!(f, "runtime error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
