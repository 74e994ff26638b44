// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::provider::ProviderKind;
use crate::domain::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionLogId(pub Uuid);

impl ActionLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ActionLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed catalogue of dispatchable operations.
///
/// Membership is enforced at the serde boundary: an unknown `action_type`
/// in a request body fails deserialization before any log row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CrmCreateContact,
    CrmUpdateContact,
    CrmSearchContacts,
    HelpdeskCreateTicket,
    HelpdeskUpdateTicket,
    HelpdeskSearchTickets,
    CalendarCreateEvent,
    CalendarListEvents,
    EmailSend,
    EmailSearch,
    KnowledgeSearch,
    KnowledgeGetArticle,
}

impl ActionType {
    /// The provider kind this operation routes to.
    pub fn kind(&self) -> ProviderKind {
        match self {
            ActionType::CrmCreateContact
            | ActionType::CrmUpdateContact
            | ActionType::CrmSearchContacts => ProviderKind::Crm,
            ActionType::HelpdeskCreateTicket
            | ActionType::HelpdeskUpdateTicket
            | ActionType::HelpdeskSearchTickets => ProviderKind::Helpdesk,
            ActionType::CalendarCreateEvent | ActionType::CalendarListEvents => {
                ProviderKind::Calendar
            }
            ActionType::EmailSend | ActionType::EmailSearch => ProviderKind::Email,
            ActionType::KnowledgeSearch | ActionType::KnowledgeGetArticle => {
                ProviderKind::Knowledge
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CrmCreateContact => "crm_create_contact",
            ActionType::CrmUpdateContact => "crm_update_contact",
            ActionType::CrmSearchContacts => "crm_search_contacts",
            ActionType::HelpdeskCreateTicket => "helpdesk_create_ticket",
            ActionType::HelpdeskUpdateTicket => "helpdesk_update_ticket",
            ActionType::HelpdeskSearchTickets => "helpdesk_search_tickets",
            ActionType::CalendarCreateEvent => "calendar_create_event",
            ActionType::CalendarListEvents => "calendar_list_events",
            ActionType::EmailSend => "email_send",
            ActionType::EmailSearch => "email_search",
            ActionType::KnowledgeSearch => "knowledge_search",
            ActionType::KnowledgeGetArticle => "knowledge_get_article",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crm_create_contact" => Ok(ActionType::CrmCreateContact),
            "crm_update_contact" => Ok(ActionType::CrmUpdateContact),
            "crm_search_contacts" => Ok(ActionType::CrmSearchContacts),
            "helpdesk_create_ticket" => Ok(ActionType::HelpdeskCreateTicket),
            "helpdesk_update_ticket" => Ok(ActionType::HelpdeskUpdateTicket),
            "helpdesk_search_tickets" => Ok(ActionType::HelpdeskSearchTickets),
            "calendar_create_event" => Ok(ActionType::CalendarCreateEvent),
            "calendar_list_events" => Ok(ActionType::CalendarListEvents),
            "email_send" => Ok(ActionType::EmailSend),
            "email_search" => Ok(ActionType::EmailSearch),
            "knowledge_search" => Ok(ActionType::KnowledgeSearch),
            "knowledge_get_article" => Ok(ActionType::KnowledgeGetArticle),
            other => Err(format!("unknown action type: {other}")),
        }
    }
}

/// Outcome states for one dispatched action.
///
/// `Pending` and `Retry` are the only non-terminal states; the row
/// transitions in place, never by appending new rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Success,
    Failure,
    Timeout,
    Retry,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Success => "success",
            ActionStatus::Failure => "failure",
            ActionStatus::Timeout => "timeout",
            ActionStatus::Retry => "retry",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Success | ActionStatus::Failure | ActionStatus::Timeout
        )
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActionStatus::Pending),
            "success" => Ok(ActionStatus::Success),
            "failure" => Ok(ActionStatus::Failure),
            "timeout" => Ok(ActionStatus::Timeout),
            "retry" => Ok(ActionStatus::Retry),
            other => Err(format!("unknown action status: {other}")),
        }
    }
}

/// Durable record of one dispatched action.
///
/// Created `pending` at dispatch start; exactly one row exists per
/// top-level dispatch call. Retries update this same row and accumulate
/// their attempt durations into `execution_time_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: ActionLogId,
    pub tenant_id: TenantId,
    pub action_type: ActionType,
    pub provider_name: String,
    pub request_payload: serde_json::Value,
    pub response_data: Option<serde_json::Value>,
    pub status: ActionStatus,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub execution_time_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActionLog {
    pub fn new(
        tenant_id: TenantId,
        action_type: ActionType,
        provider_name: String,
        request_payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ActionLogId::new(),
            tenant_id,
            action_type,
            provider_name,
            request_payload,
            response_data: None,
            status: ActionStatus::Pending,
            error_message: None,
            attempts: 0,
            execution_time_ms: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Account one handler invocation's wall time. Backoff sleeps between
    /// attempts are not included.
    pub fn record_attempt(&mut self, elapsed_ms: i64) {
        self.attempts += 1;
        self.execution_time_ms += elapsed_ms.max(0);
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, response: serde_json::Value) {
        self.status = ActionStatus::Success;
        self.response_data = Some(response);
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: String) {
        self.status = ActionStatus::Failure;
        self.error_message = Some(error);
        self.updated_at = Utc::now();
    }

    /// Terminal timeout: no response payload is ever stored.
    pub fn time_out(&mut self, error: String) {
        self.status = ActionStatus::Timeout;
        self.response_data = None;
        self.error_message = Some(error);
        self.updated_at = Utc::now();
    }

    /// Non-terminal: the dispatcher will re-enter the attempt loop.
    pub fn mark_retry(&mut self, error: String) {
        self.status = ActionStatus::Retry;
        self.error_message = Some(error);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_type_routes_to_its_kind() {
        assert_eq!(ActionType::CrmCreateContact.kind(), ProviderKind::Crm);
        assert_eq!(
            ActionType::HelpdeskSearchTickets.kind(),
            ProviderKind::Helpdesk
        );
        assert_eq!(ActionType::CalendarListEvents.kind(), ProviderKind::Calendar);
        assert_eq!(ActionType::EmailSend.kind(), ProviderKind::Email);
        assert_eq!(ActionType::KnowledgeSearch.kind(), ProviderKind::Knowledge);
    }

    #[test]
    fn action_type_serde_uses_snake_case() {
        let raw = serde_json::to_string(&ActionType::CrmCreateContact).unwrap();
        assert_eq!(raw, "\"crm_create_contact\"");
        assert!(serde_json::from_str::<ActionType>("\"launch_missiles\"").is_err());
    }

    #[test]
    fn string_round_trip_covers_every_variant() {
        for action in [
            ActionType::CrmCreateContact,
            ActionType::CrmUpdateContact,
            ActionType::CrmSearchContacts,
            ActionType::HelpdeskCreateTicket,
            ActionType::HelpdeskUpdateTicket,
            ActionType::HelpdeskSearchTickets,
            ActionType::CalendarCreateEvent,
            ActionType::CalendarListEvents,
            ActionType::EmailSend,
            ActionType::EmailSearch,
            ActionType::KnowledgeSearch,
            ActionType::KnowledgeGetArticle,
        ] {
            assert_eq!(action.as_str().parse::<ActionType>().unwrap(), action);
        }
    }

    #[test]
    fn lifecycle_accumulates_attempts() {
        let mut log = ActionLog::new(
            TenantId::new(),
            ActionType::EmailSend,
            "postmark".into(),
            json!({"to": "a@b.c"}),
        );
        assert_eq!(log.status, ActionStatus::Pending);

        log.record_attempt(120);
        log.mark_retry("Rate limit exceeded".into());
        assert_eq!(log.status, ActionStatus::Retry);
        assert!(!log.status.is_terminal());

        log.record_attempt(80);
        log.complete(json!({"id": "msg-1"}));
        assert_eq!(log.status, ActionStatus::Success);
        assert!(log.status.is_terminal());
        assert_eq!(log.attempts, 2);
        assert_eq!(log.execution_time_ms, 200);
        assert!(log.error_message.is_none());
    }

    #[test]
    fn timeout_drops_response_data() {
        let mut log = ActionLog::new(
            TenantId::new(),
            ActionType::KnowledgeSearch,
            "confluence".into(),
            json!({"query": "vpn"}),
        );
        log.record_attempt(30_000);
        log.time_out("provider call exceeded 30s".into());
        assert_eq!(log.status, ActionStatus::Timeout);
        assert!(log.response_data.is_none());
        assert!(log.error_message.is_some());
    }
}
