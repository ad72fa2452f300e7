/// The slice of a channel the gateway needs: enough to resolve a channel to
/// its parent server for membership checks.
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub id: i64,
    pub server_id: i64,
}
