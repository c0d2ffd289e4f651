#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use campus::campus_config::{CalendarConfig, CorsConfig};
use campus::campus_models::{
    AcademicCalendarType, AcademicEvent, AcademicEventId, EducationGroupType, EducationGroupYear,
    EducationGroupYearId, LearningUnitYear, LearningUnitYearId, SessionNumber,
};
use campus::modules::academic_calendar::repository::InMemoryAcademicEventRepository;
use campus::modules::program_tree::repository::{
    InMemoryProgramTreeRepository, ProgramTreeRepository,
};
use campus::router::init_router;
use campus::state::AppState;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn event(
    reference: AcademicCalendarType,
    target_year: i32,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    session: Option<u8>,
) -> AcademicEvent {
    AcademicEvent {
        id: AcademicEventId::new(),
        title: format!("{} {}", reference, target_year),
        reference,
        authorized_target_year: target_year,
        start_date,
        end_date,
        session: session.map(|s| SessionNumber::try_from(i32::from(s)).unwrap()),
    }
}

pub fn branch(education_group_type: EducationGroupType, academic_year: i32) -> EducationGroupYear {
    let id = EducationGroupYearId::new();
    EducationGroupYear {
        id,
        acronym: format!("G{}", &id.to_string()[..6]).to_uppercase(),
        title: "Test group".to_string(),
        education_group_type,
        academic_year,
    }
}

pub fn leaf(academic_year: i32) -> LearningUnitYear {
    let id = LearningUnitYearId::new();
    LearningUnitYear {
        id,
        acronym: format!("L{}", &id.to_string()[..6]).to_uppercase(),
        title: "Test learning unit".to_string(),
        academic_year,
    }
}

pub struct TestApp {
    pub calendars: Arc<InMemoryAcademicEventRepository>,
    pub program_tree: Arc<InMemoryProgramTreeRepository>,
}

impl TestApp {
    pub fn new(events: Vec<AcademicEvent>) -> Self {
        Self {
            calendars: Arc::new(InMemoryAcademicEventRepository::with_events(events)),
            program_tree: Arc::new(InMemoryProgramTreeRepository::new()),
        }
    }

    pub async fn with_branches(self, nodes: &[&EducationGroupYear]) -> Self {
        for node in nodes {
            self.program_tree.save_branch(node).await.unwrap();
        }
        self
    }

    pub async fn with_leaves(self, nodes: &[&LearningUnitYear]) -> Self {
        for node in nodes {
            self.program_tree.save_leaf(node).await.unwrap();
        }
        self
    }

    pub fn router(&self) -> axum::Router {
        let state = AppState {
            calendars: self.calendars.clone(),
            program_tree: self.program_tree.clone(),
            cors_config: CorsConfig::default(),
            calendar_config: CalendarConfig::default(),
        };
        init_router(state, None)
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }
}

pub fn uuid_of(value: &Value) -> Uuid {
    value.as_str().unwrap().parse().unwrap()
}
