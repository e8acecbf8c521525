//! Push channel handler: forwards channel messages to the dispatcher.

use board_client::push::PushMessage;
use tokio::sync::mpsc;

use crate::background::RefreshTrigger;
use crate::dispatcher::AppMessage;

/// Forward messages from one push session until it ends.
///
/// When `refresh` is set, every domain event also asks the polling loop for
/// an immediate full refresh. The event is queued first so it is applied
/// before the refreshed list arrives.
pub async fn forward(
    mut events: mpsc::Receiver<PushMessage>,
    tx: mpsc::Sender<AppMessage>,
    refresh: Option<RefreshTrigger>,
) {
    while let Some(msg) = events.recv().await {
        let is_event = matches!(msg, PushMessage::Event(_));
        if tx.send(AppMessage::Push(msg)).await.is_err() {
            tracing::debug!("Dispatcher gone, dropping push messages");
            return;
        }
        if is_event {
            if let Some(refresh) = &refresh {
                refresh.request();
            }
        }
    }
    tracing::debug!("Push session ended");
}
