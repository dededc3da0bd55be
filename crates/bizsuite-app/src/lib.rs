// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod forms;
pub mod ids;
pub mod listing;
pub mod model;
pub mod notifications;
pub mod state;

pub use forms::*;
pub use ids::*;
pub use listing::*;
pub use model::*;
pub use notifications::*;
pub use state::*;
