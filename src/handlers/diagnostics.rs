use axum::{extract::State, http::StatusCode, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

use crate::AppState;
use crate::models::DiagnosticsResponse;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Live collaboration counters plus process host stats
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
) -> (StatusCode, Json<DiagnosticsResponse>) {
    let collab = &app_state.collab;

    // Aggregate diagnostics from the registry
    let mut n_rooms: u32 = 0;
    let mut n_editors: u32 = 0;
    let mut n_conn: u32 = 0;
    let mut n_locks: u32 = 0;
    for (_, session) in collab.registry().sessions().await {
        let s = session.lock().await;
        n_rooms += 1;
        n_editors += s.editor_count() as u32;
        n_conn += s.connection_count() as u32;
        n_locks += s.lock_count() as u32;
    }

    let n_user_ctx = collab.user_ctx_count() as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB, Rooms: {}, Editors: {}, Conn: {}, Locks: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        n_rooms,
        n_editors,
        n_conn,
        n_locks
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_rooms,
            n_editors,
            n_conn,
            n_locks,
            n_user_ctx,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
