//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerError};
use crate::download::delivery::ChatTarget;
use crate::download::replay::handle_retry_command;
use crate::telegram::bot::Command;
use crate::telegram::intake::{is_chat_allowed, Incoming};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Commands are matched first; any other text is checked for a supported link.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_links = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(link_handler(deps_links))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Retry => {
                        if !is_chat_allowed(msg.chat.id.0, &deps.allowed_chats) {
                            return Ok(());
                        }
                        let target = ChatTarget::new(
                            msg.chat.id.0,
                            msg.thread_id.filter(|_| msg.is_topic_message).map(|t| t.0 .0),
                        );
                        let command_message_id = msg.id.0;

                        // Jobs can take minutes; keep the chat's update stream moving
                        tokio::spawn(async move {
                            if let Err(e) = handle_retry_command(
                                deps.messenger.as_ref(),
                                deps.store.as_ref(),
                                &deps.queue,
                                target,
                                command_message_id,
                            )
                            .await
                            {
                                log::error!("/retry in chat {} failed: {}", target.chat_id, e);
                            }
                        });
                    }
                }

                Ok::<(), HandlerError>(())
            }
        },
    ))
}

fn link_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |msg: Message| {
        let deps = deps.clone();
        async move {
            let job = Incoming::from_message(&msg).and_then(|incoming| incoming.into_job(&deps.allowed_chats));
            if let Some(job) = job {
                deps.submit(job);
            }
            Ok::<(), HandlerError>(())
        }
    })
}
