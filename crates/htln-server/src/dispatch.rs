//! Per-request dispatch: the access check, handler invocation, and
//! idle-timer bookkeeping that make up the five dispatch steps every
//! request goes through.

use htln_proto::Transaction;
use tracing::{debug, warn};

use crate::error::Error;
use crate::handlers;
use crate::server::Server;

/// Run one decoded request through access control and its handler,
/// returning the reply to send back (if any).
///
/// Unknown transaction types are logged and silently ignored (no reply).
/// A denied or failed request becomes an error reply unless the error
/// closes the session, in which case `Err` propagates to the connection
/// loop so it can tear the session down.
pub async fn dispatch(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    if let Some(required) = handlers::required_access(req.ttype) {
        let access = server
            .registry
            .with_session(session_id, |s| s.access)
            .await
            .ok_or_else(|| Error::transport("session closed before dispatch"))?;
        if !access.has(required) {
            debug!(ttype = req.ttype, session_id, "denied: missing access bit");
            return Ok(Some(Transaction::error_reply(req, "Access denied.")));
        }
    }

    let result = handlers::handle(server, session_id, req).await;

    if req.ttype != htln_proto::txn_type::KEEP_ALIVE {
        if server.registry.clear_idle(session_id).await {
            handlers::notify_idle_cleared(server, session_id).await;
        }
    }

    match result {
        Ok(reply) => Ok(reply),
        Err(e) if e.closes_session() => {
            warn!(session_id, error = %e, "closing session on transport error");
            Err(e)
        }
        Err(e) => {
            let message = e.client_message().unwrap_or("Cannot complete operation.");
            debug!(ttype = req.ttype, session_id, error = %e, "request failed");
            Ok(Some(Transaction::error_reply(req, message)))
        }
    }
}
