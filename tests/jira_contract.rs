//! Jira adapter contract tests against a local mock server.

use serde_json::json;
use timeboard::error::{Service, SyncError};
use timeboard::model::board::Profile;
use timeboard::providers::jira::JiraClient;
use timeboard::providers::IssueTracker;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("me@acme.com:j-token")
const BASIC_AUTH: &str = "Basic bWVAYWNtZS5jb206ai10b2tlbg==";

fn profile(server: &MockServer) -> Profile {
    Profile {
        name: "work".into(),
        url: format!("{}/", server.uri()),
        email: "me@acme.com".into(),
        token: "j-token".into(),
    }
}

fn issue(id: &str, key: &str, status: &str, assignee: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "key": key,
        "fields": {
            "summary": format!("Work on {key}"),
            "status": {"id": status, "name": "whatever"},
            "assignee": assignee.map(|email| json!({"emailAddress": email, "displayName": "Someone"})),
            "priority": {"id": "2", "name": "High"}
        }
    })
}

#[tokio::test]
async fn boards_are_listed_per_project_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board"))
        .and(query_param("projectKeyOrId", "ABC"))
        .and(header("Authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": 1, "name": "Team", "type": "scrum"}, {"id": 3, "name": "Kanban"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let boards = JiraClient::new()
        .list_boards(&profile(&server), "ABC")
        .await
        .unwrap();
    let keys: Vec<String> = boards.iter().map(|b| b.mapping_key()).collect();
    assert_eq!(keys, vec!["Team-1", "Kanban-3"]);
    assert_eq!(boards[0].profile.name, "work");
}

#[tokio::test]
async fn columns_keep_status_order_and_skip_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/1/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "columnConfig": {
                "columns": [
                    {"name": "Backlog", "statuses": []},
                    {"name": "To Do", "statuses": [{"id": "1"}]},
                    {"name": "In Progress", "statuses": [{"id": "3"}, {"id": "10001"}]}
                ]
            }
        })))
        .mount(&server)
        .await;

    let columns = JiraClient::new()
        .board_columns(1, &profile(&server))
        .await
        .unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1].name, "In Progress");
    assert_eq!(columns[1].entry_status(), Some("3"));
    assert_eq!(columns[1].status_ids, vec!["3", "10001"]);
}

#[tokio::test]
async fn active_sprint_queries_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/1/sprint"))
        .and(query_param("state", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": 11, "name": "Sprint 4", "state": "active"}]
        })))
        .mount(&server)
        .await;

    let sprint = JiraClient::new()
        .active_sprint(1, &profile(&server))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sprint.id, 11);
}

#[tokio::test]
async fn no_active_sprint_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/1/sprint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
        .mount(&server)
        .await;

    let sprint = JiraClient::new()
        .active_sprint(1, &profile(&server))
        .await
        .unwrap();
    assert!(sprint.is_none());
}

#[tokio::test]
async fn sprint_tickets_are_paged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/sprint/11/issue"))
        .and(query_param("startAt", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0,
            "maxResults": 2,
            "total": 3,
            "issues": [issue("10001", "ABC-1", "1", None), issue("10002", "ABC-2", "3", Some("me@acme.com"))]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/sprint/11/issue"))
        .and(query_param("startAt", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 2,
            "maxResults": 2,
            "total": 3,
            "issues": [issue("10003", "ABC-3", "5", None)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tickets = JiraClient::new()
        .sprint_tickets(11, &profile(&server))
        .await
        .unwrap();
    assert_eq!(tickets.len(), 3);
    assert_eq!(tickets[0].assignee_email, None);
    assert_eq!(tickets[1].assignee_email.as_deref(), Some("me@acme.com"));
    assert_eq!(tickets[1].priority_rank, 2);
    assert_eq!(tickets[2].summary, "Work on ABC-3");
}

#[tokio::test]
async fn transitions_map_target_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/10001/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transitions": [
                {"id": "11", "name": "Start", "to": {"id": "3", "name": "In Progress"}},
                {"id": "21", "name": "Done", "to": {"id": "5", "name": "Done"}}
            ]
        })))
        .mount(&server)
        .await;

    let transitions = JiraClient::new()
        .available_transitions("10001", &profile(&server))
        .await
        .unwrap();
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[1].id, "21");
    assert_eq!(transitions[1].to_status_id, "5");
}

#[tokio::test]
async fn apply_transition_posts_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/10001/transitions"))
        .and(body_json(json!({"transition": {"id": "21"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    JiraClient::new()
        .apply_transition("10001", "21", &profile(&server))
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_transition_maps_to_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/10001/transitions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorMessages": ["Transition id '99' is not valid for this issue."]
        })))
        .mount(&server)
        .await;

    let err = JiraClient::new()
        .apply_transition("10001", "99", &profile(&server))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Network {
            service: Service::IssueTracking,
            status: 400
        }
    ));
}

#[tokio::test]
async fn profile_identity_reads_myself() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .and(header("Authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountId": "5b10a2844c20165700ede21g",
            "displayName": "Mia Krystof",
            "avatarUrls": {"48x48": "https://avatar/48.png", "24x24": "https://avatar/24.png"}
        })))
        .mount(&server)
        .await;

    let me = JiraClient::new()
        .profile_identity(&profile(&server))
        .await
        .unwrap();
    assert_eq!(me.account_id, "5b10a2844c20165700ede21g");
    assert_eq!(me.display_name, "Mia Krystof");
    assert_eq!(me.avatar_url.as_deref(), Some("https://avatar/48.png"));
}

#[tokio::test]
async fn missing_fields_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/1/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let err = JiraClient::new()
        .board_columns(1, &profile(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MalformedResponse(_)));
}

#[tokio::test]
async fn projects_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/project"))
        .and(header("Authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "10000", "key": "ABC", "name": "Alphabet", "projectTypeKey": "software"},
            {"id": "10001", "key": "XYZ", "name": "Omega"}
        ])))
        .mount(&server)
        .await;

    let projects = JiraClient::new()
        .list_projects(&profile(&server))
        .await
        .unwrap();
    let keys: Vec<&str> = projects.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["ABC", "XYZ"]);
    assert_eq!(projects[1].name, "Omega");
}
