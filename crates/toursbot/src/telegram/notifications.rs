//! Outbound notifications: the receipt → message lookup table, group
//! broadcasts, and admin pings.

use std::sync::Arc;
use teloxide::prelude::*;

use tourscore::chain::TxType;
use tourscore::config;
use tourscore::storage::db::{get_all_users, get_connection, DbPool};

/// Translate a (tx_type, receipt status) pair into the user-facing line and
/// an optional group-chat broadcast. A static lookup, nothing more.
pub fn relay_lines(tx_type: TxType, success: bool) -> (String, Option<String>) {
    if !success {
        let text = match tx_type {
            TxType::Approve => "❌ The approval transaction reverted. Nothing was spent — try again.",
            TxType::CreateProfile => "❌ Profile creation reverted on-chain.",
            TxType::JournalEntry => "❌ The journal entry transaction reverted.",
            TxType::BuyTokens => "❌ The token purchase reverted. Your funds were not taken.",
            TxType::CreateClimb => "❌ The climb listing transaction reverted.",
            TxType::PurchaseClimb => "❌ The climb purchase reverted. No TOURS were spent.",
            TxType::CreateTournament => "❌ Tournament creation reverted.",
            TxType::JoinTournament => "❌ Joining the tournament reverted. Your entry fee was not taken.",
            TxType::EndTournament => "❌ Ending the tournament reverted.",
        };
        return (text.to_string(), None);
    }

    match tx_type {
        TxType::Approve => (
            "✅ Approval confirmed! Building the next transaction now...".to_string(),
            None,
        ),
        TxType::CreateProfile => ("✅ Profile created. Welcome to EmpowerTours! 🧗".to_string(), None),
        TxType::JournalEntry => ("✅ Journal entry recorded on-chain. 📓".to_string(), None),
        TxType::BuyTokens => ("✅ TOURS purchased! Check /balance.".to_string(), None),
        TxType::CreateClimb => (
            "✅ Your climb is listed! Others can now find it under /climbs.".to_string(),
            Some("🧗 A new climb was just listed on EmpowerTours! See /climbs.".to_string()),
        ),
        TxType::PurchaseClimb => (
            "✅ Climb purchased! The route location is now unlocked in /climbs.".to_string(),
            Some("🎉 A climb was just purchased on EmpowerTours!".to_string()),
        ),
        TxType::CreateTournament => (
            "✅ Tournament created! Climbers can join with /jointournament.".to_string(),
            Some("🏆 A new tournament is open on EmpowerTours! Join with /jointournament.".to_string()),
        ),
        TxType::JoinTournament => ("✅ You are in! Good luck. 🏆".to_string(), None),
        TxType::EndTournament => (
            "✅ Tournament ended and the prize pool paid out.".to_string(),
            Some("🏆 An EmpowerTours tournament just finished — congratulations to the winner!".to_string()),
        ),
    }
}

/// Send a broadcast to the configured group chat, if any.
pub async fn broadcast_group(bot: &Bot, text: &str) {
    let Some(chat_id) = *config::GROUP_CHAT_ID else {
        log::debug!("GROUP_CHAT_ID not set, skipping broadcast");
        return;
    };
    if let Err(e) = bot.send_message(ChatId(chat_id), text).await {
        log::error!("Failed to send group broadcast: {}", e);
    }
}

/// Notify the administrator that a new membership application arrived.
pub async fn notify_admin_new_application(bot: Bot, db_pool: Arc<DbPool>, user_id: i64, name: &str) {
    // Find the admin's ChatId by username
    let admin_chat_id = match get_connection(&db_pool) {
        Ok(conn) => match get_all_users(&conn) {
            Ok(users) => users
                .iter()
                .find(|u| u.username.as_deref() == Some(config::ADMIN_USERNAME.as_str()))
                .map(|u| ChatId(u.telegram_id)),
            Err(e) => {
                log::error!("Failed to get users for admin notification: {}", e);
                None
            }
        },
        Err(e) => {
            log::error!("Failed to get DB connection for admin notification: {}", e);
            None
        }
    };

    if let Some(chat_id) = admin_chat_id {
        let message = format!(
            "📋 New application\n\nUser ID: {}\nName: {}\n\nReview with /applications, then /approveapp {} or /rejectapp {}",
            user_id, name, user_id, user_id
        );
        if let Err(e) = bot.send_message(chat_id, message).await {
            log::error!("Failed to send admin notification: {}", e);
        }
    } else {
        log::warn!(
            "Admin user '{}' not found in database. Application from {} not forwarded",
            config::ADMIN_USERNAME.as_str(),
            user_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [TxType; 9] = [
        TxType::Approve,
        TxType::CreateProfile,
        TxType::JournalEntry,
        TxType::BuyTokens,
        TxType::CreateClimb,
        TxType::PurchaseClimb,
        TxType::CreateTournament,
        TxType::JoinTournament,
        TxType::EndTournament,
    ];

    #[test]
    fn every_pair_has_a_user_line() {
        for t in ALL_TYPES {
            for success in [true, false] {
                let (user, _) = relay_lines(t, success);
                assert!(!user.is_empty(), "missing line for {:?}/{}", t, success);
            }
        }
    }

    #[test]
    fn failures_never_broadcast() {
        for t in ALL_TYPES {
            let (_, group) = relay_lines(t, false);
            assert!(group.is_none());
        }
    }

    #[test]
    fn public_events_broadcast_on_success() {
        assert!(relay_lines(TxType::CreateClimb, true).1.is_some());
        assert!(relay_lines(TxType::PurchaseClimb, true).1.is_some());
        assert!(relay_lines(TxType::CreateTournament, true).1.is_some());
        assert!(relay_lines(TxType::EndTournament, true).1.is_some());
        // Personal events stay private
        assert!(relay_lines(TxType::Approve, true).1.is_none());
        assert!(relay_lines(TxType::JournalEntry, true).1.is_none());
    }

    #[test]
    fn success_and_failure_lines_differ() {
        for t in ALL_TYPES {
            assert_ne!(relay_lines(t, true).0, relay_lines(t, false).0);
        }
    }
}
