//! Built-in handlers, one per Trello action type.
//!
//! Action names are listed in Trello's board API reference. Every handler
//! returns `None` when a sub-object it needs is missing so that the event
//! is still reported through [`generic`].

use serde_json::Value;

use super::{Handler, HandlerOutput};
use crate::events::record::markdown_link;
use crate::events::{EventRecord, UNKNOWN};

pub(super) const CATALOG: &[(&str, Handler)] = &[
    ("addAttachmentToCard", add_attachment_to_card),
    ("addChecklistToCard", add_checklist_to_card),
    ("addMemberToBoard", add_member_to_board),
    ("addMemberToCard", add_member_to_card),
    ("commentCard", comment_card),
    ("createBoard", create_board),
    ("createCard", create_card),
    ("createList", create_list),
    ("moveCardFromBoard", move_card_from_board),
    ("moveCardToBoard", move_card_to_board),
    ("removeMemberFromCard", remove_member_from_card),
    ("updateBoard", update_board),
    ("updateCard", update_card),
    ("updateCheckItemStateOnCard", update_check_item_state_on_card),
];

fn text(body: String) -> Option<HandlerOutput> {
    Some(HandlerOutput::Text(body))
}

fn suppress() -> Option<HandlerOutput> {
    Some(HandlerOutput::Suppress)
}

/// True when `pointer` exists in `data` and is not `null`.
fn changed(e: &EventRecord, pointer: &str) -> bool {
    e.data(pointer).is_some_and(|v| !v.is_null())
}

/// Full name of the member an action was about.
fn member_name(e: &EventRecord) -> Option<&str> {
    e.field("/member/fullName")
        .and_then(Value::as_str)
        .or_else(|| e.data_str("/member/fullName"))
}

/// Fallback for unknown types and events missing the fields their handler
/// needs: `<actor> performed <type> on <card or board>`.
pub(super) fn generic(e: &EventRecord) -> HandlerOutput {
    let bold = |name: &str| format!("**{name}**");
    let target = e
        .card_link()
        .or_else(|| e.card_name().map(bold))
        .or_else(|| e.board_link())
        .or_else(|| e.board_name().map(bold));

    let body = match target {
        Some(target) => format!("{} performed {} on {target}", e.creator_name(), e.kind()),
        None => format!("{} performed {}", e.creator_name(), e.kind()),
    };
    HandlerOutput::Text(body)
}

fn add_attachment_to_card(e: &EventRecord) -> Option<HandlerOutput> {
    let attachment = markdown_link(
        e.data_str("/attachment/name")?,
        e.data_str("/attachment/url")?,
    );
    text(format!(
        "{} added {attachment} attachment to card {}",
        e.creator_name(),
        e.card_link()?
    ))
}

fn add_checklist_to_card(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!(
        "{} added checklist **{}** to card {}",
        e.creator_name(),
        e.data_str("/checklist/name")?,
        e.card_link()?
    ))
}

// Only carries `idMemberAdded`; nothing worth announcing without a lookup.
fn add_member_to_board(_: &EventRecord) -> Option<HandlerOutput> {
    suppress()
}

fn add_member_to_card(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!(
        "{} added **{}** to card {}",
        e.creator_name(),
        member_name(e)?,
        e.card_link()?
    ))
}

fn remove_member_from_card(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!(
        "{} removed **{}** from card {}",
        e.creator_name(),
        member_name(e)?,
        e.card_link()?
    ))
}

fn create_board(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!("{} created board {}", e.creator_name(), e.board_link()?))
}

fn create_card(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!("{} created card {}", e.creator_name(), e.card_link()?))
}

fn create_list(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!(
        "{} created list **{}** on board {}",
        e.creator_name(),
        e.data_str("/list/name")?,
        e.board_link()?
    ))
}

fn comment_card(e: &EventRecord) -> Option<HandlerOutput> {
    let state = if changed(e, "/dateLastEdited") {
        "edited comment"
    } else {
        "commented"
    };
    let quoted = e.data_str("/text")?.replace('\n', "\n>");
    text(format!(
        "{} {state} on card {} \n>{quoted}\n\n",
        e.creator_name(),
        e.card_link()?
    ))
}

fn move_card_from_board(e: &EventRecord) -> Option<HandlerOutput> {
    text(format!(
        "{} moved card {} from **{}** to **{}**",
        e.creator_name(),
        e.card_link()?,
        e.board_name()?,
        e.data_str("/boardTarget/name").unwrap_or(UNKNOWN)
    ))
}

// Every cross-board move also fires moveCardFromBoard, which reports it.
fn move_card_to_board(_: &EventRecord) -> Option<HandlerOutput> {
    suppress()
}

fn update_board(e: &EventRecord) -> Option<HandlerOutput> {
    let old_name = e.data_str("/old/name")?;
    text(format!(
        "{} renamed board from **{old_name}** to **{}**",
        e.creator_name(),
        e.board_name()?
    ))
}

/// What changed is signalled by the keys of `data.old`; the first match wins.
fn update_card(e: &EventRecord) -> Option<HandlerOutput> {
    let actor = e.creator_name();

    if changed(e, "/old/idList") {
        return text(format!(
            "{actor} moved card {} from **{}** to **{}**",
            e.card_link()?,
            e.data_str("/listBefore/name")?,
            e.data_str("/listAfter/name")?
        ));
    }

    if changed(e, "/old/closed") {
        let closed = e.data("/card/closed")?.as_bool()?;
        let state = if closed { "archived" } else { "re-opened" };
        return text(format!("{actor} {state} card {}", e.card_link()?));
    }

    if changed(e, "/old/name") {
        return text(format!(
            "{actor} renamed card from **{}** to {}",
            e.data_str("/old/name")?,
            e.card_link()?
        ));
    }

    // The new description is not included in the message.
    if changed(e, "/old/desc") {
        return text(format!(
            "{actor} updated description for card {}",
            e.card_link()?
        ));
    }

    // `old.due` is null when a due date is first added, so presence counts.
    if e.data("/old/due").is_some() {
        let state = match e.data("/card/due") {
            Some(Value::String(due)) => format!("added due date **{due}** to"),
            Some(Value::Null) | None => "removed due date from".to_string(),
            Some(due) => format!("added due date **{due}** to"),
        };
        return text(format!("{actor} {state} card {}", e.card_link()?));
    }

    // Position changes accompany a list move, which is reported separately.
    if changed(e, "/old/pos") {
        return suppress();
    }

    None
}

fn update_check_item_state_on_card(e: &EventRecord) -> Option<HandlerOutput> {
    let state = match e.data_str("/checkItem/state")? {
        "incomplete" => "unchecked",
        _ => "checked",
    };
    text(format!(
        "{} {state} **{}** on card {}",
        e.creator_name(),
        e.data_str("/checkItem/name")?,
        e.card_link()?
    ))
}
