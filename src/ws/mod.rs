pub mod cell_locks;
pub mod connctx;
pub mod docsession;
pub mod presence;
pub mod registry;
pub mod userctx;
