//! Integration tests for the default pipeline over on-disk sites.

#[cfg(test)]
mod tests {
    use crate::context::{RequestContext, ResponseContext, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE};
    use crate::core::{StageKind, StageOutput, StageStatus};
    use crate::errors::SitepipeError;
    use crate::events::{CollectingEventSink, EventSink, PipelineEventKind};
    use crate::pipeline::{DefaultErrorHandler, Pipeline, PipelineReport, INTERNAL_ERROR_BODY};
    use crate::routing::ControllerRegistry;
    use crate::services::SiteServices;
    use crate::stages::{default_stages, FnStage, Stage};
    use crate::testing::{
        FailingCleanupParser, FailingStage, FailingStaticTransport, FinishingStage,
        RecordingStage, SiteFixture, StageLog,
    };
    use axum::http::header::CONTENT_TYPE;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    struct Run {
        req: RequestContext,
        res: ResponseContext,
        report: PipelineReport,
    }

    fn pipeline(services: &Arc<SiteServices>, sink: &Arc<CollectingEventSink>) -> Pipeline {
        Pipeline::new(default_stages(services))
            .with_error_handler(Arc::new(DefaultErrorHandler::with_services(Arc::clone(services))))
            .with_event_sink(Arc::clone(sink) as Arc<dyn EventSink>)
    }

    async fn run(pipeline: &Pipeline, uri: &str) -> Run {
        let mut req = RequestContext::get(uri);
        let mut res = ResponseContext::new();
        let report = pipeline.run(&mut req, &mut res).await;
        Run { req, res, report }
    }

    async fn run_site(services: &Arc<SiteServices>, uri: &str) -> (Run, Arc<CollectingEventSink>) {
        let sink = Arc::new(CollectingEventSink::new());
        let run = run(&pipeline(services, &sink), uri).await;
        (run, sink)
    }

    fn controllers(route: &str, payload: serde_json::Value) -> ControllerRegistry {
        let registry = ControllerRegistry::new();
        registry.register_fn(route, move |_req, res| {
            res.set_payload(payload.clone());
            Ok(())
        });
        registry
    }

    #[tokio::test]
    async fn test_root_without_routes_is_404() {
        let site = SiteFixture::new();
        let (run, sink) = run_site(&site.services(), "/").await;

        assert_eq!(run.res.status(), StatusCode::NOT_FOUND);
        assert_eq!(run.res.body_text(), "404 Not Found");
        assert!(run.report.is_success());
        assert_eq!(
            sink.stages_with(PipelineEventKind::StageSkipped),
            vec!["serve_static", "render", "emit"]
        );
        assert!(run.report.executed().contains(&"cleanup"));
    }

    #[tokio::test]
    async fn test_default_controller_payload_is_json() {
        let site = SiteFixture::new();
        let services = site.services_with(controllers("default", json!({"foo": "bar"})));
        let (run, _) = run_site(&services, "/").await;

        assert_eq!(run.res.status(), StatusCode::OK);
        assert_eq!(run.res.body_text(), r#"{"foo":"bar"}"#);
        assert_eq!(run.res.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_template_only_renders_without_controller() {
        let site = SiteFixture::new().template("default.tmpl", "<h1>Hello</h1>");
        let (run, _) = run_site(&site.services(), "/").await;

        assert_eq!(run.res.status(), StatusCode::OK);
        assert_eq!(run.res.body_text(), "<h1>Hello</h1>");
        assert_eq!(run.res.headers().get(CONTENT_TYPE).unwrap(), HTML_CONTENT_TYPE);
        assert_eq!(
            run.report.record("run_controller").unwrap().status,
            StageStatus::Skip
        );
    }

    #[tokio::test]
    async fn test_controller_payload_feeds_template() {
        let site = SiteFixture::new().template("hello.tmpl", "<p><%= name %></p>");
        let services = site.services_with(controllers("hello", json!({"name": "ada"})));
        let (run, _) = run_site(&services, "/hello").await;

        assert_eq!(run.res.body_text(), "<p>ada</p>");
    }

    #[tokio::test]
    async fn test_json_suffix_never_renders_html() {
        let site = SiteFixture::new().template("hello.tmpl", "<p><%= name %></p>");
        let services = site.services_with(controllers("hello", json!({"name": "ada"})));
        let (run, _) = run_site(&services, "/hello.json").await;

        assert!(!run.req.render_requested());
        assert_eq!(run.res.body_text(), r#"{"name":"ada"}"#);
        assert_eq!(run.res.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert_eq!(run.report.record("render").unwrap().status, StageStatus::Skip);
    }

    #[tokio::test]
    async fn test_missing_json_is_404_without_html() {
        let site = SiteFixture::new().template("404.tmpl", "<h1>Lost</h1>");
        let (run, _) = run_site(&site.services(), "/missing.json").await;

        assert_eq!(run.res.status(), StatusCode::NOT_FOUND);
        assert!(!run.req.render_requested());
        assert_eq!(run.res.body_text(), "404 Not Found");
    }

    #[tokio::test]
    async fn test_not_found_template_is_rendered_with_404() {
        let site = SiteFixture::new().template("404.tmpl", "<h1>Lost</h1>");
        let (run, _) = run_site(&site.services(), "/nowhere").await;

        assert_eq!(run.res.status(), StatusCode::NOT_FOUND);
        assert_eq!(run.res.body_text(), "<h1>Lost</h1>");
    }

    #[tokio::test]
    async fn test_controller_failure_is_500_and_cleanup_runs() {
        let site = SiteFixture::new();
        let registry = ControllerRegistry::new();
        registry.register_fn("default", |_req, _res| {
            Err(SitepipeError::stage("controller", "controller exploded"))
        });
        let (run, sink) = run_site(&site.services_with(registry), "/").await;

        assert_eq!(run.res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(run.res.body_text(), INTERNAL_ERROR_BODY);
        assert!(!run.report.is_success());
        assert_eq!(sink.stages_with(PipelineEventKind::StageFailed), vec!["run_controller"]);
        assert_eq!(run.report.record("cleanup").unwrap().status, StageStatus::Ok);
        assert!(run.report.executed().contains(&"cleanup"));
    }

    #[tokio::test]
    async fn test_custom_error_template() {
        let site = SiteFixture::new().template("500.tmpl", "<h1>Oops <%= statusCode %></h1>");
        let registry = ControllerRegistry::new();
        registry.register_fn("default", |_req, _res| Err(SitepipeError::stage("controller", "no")));
        let (run, _) = run_site(&site.services_with(registry), "/").await;

        assert_eq!(run.res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(run.res.body_text(), "<h1>Oops 500</h1>");
    }

    #[tokio::test]
    async fn test_static_file_short_circuits() {
        let site = SiteFixture::new().static_file("foo.txt", "bar");
        let (run, sink) = run_site(&site.services(), "/foo.txt").await;

        assert_eq!(run.res.status(), StatusCode::OK);
        assert_eq!(run.res.body_text(), "bar");
        assert!(run.req.is_finished());
        assert_eq!(
            sink.stages_with(PipelineEventKind::StageSkipped),
            vec!["run_controller", "render", "emit"]
        );
    }

    #[tokio::test]
    async fn test_static_json_file_is_served_for_json_path() {
        let site = SiteFixture::new().static_file("foo.json", r#"{"foo":"bar"}"#);
        let (run, _) = run_site(&site.services(), "/foo.json").await;

        assert_eq!(run.res.status(), StatusCode::OK);
        assert_eq!(run.res.body_text(), r#"{"foo":"bar"}"#);
        assert_eq!(run.res.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_static_transport_failure_is_500() {
        let site = SiteFixture::new().static_file("foo.txt", "bar");
        let services = Arc::new(
            (*site.services())
                .clone()
                .with_static_transport(Arc::new(FailingStaticTransport)),
        );
        let (run, _) = run_site(&services, "/foo.txt").await;

        assert_eq!(run.res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(run.res.body_text(), INTERNAL_ERROR_BODY);
        assert_eq!(run.report.error.as_ref().unwrap().kind(), "static_transport");
    }

    #[tokio::test]
    async fn test_circular_template_is_500() {
        let site = SiteFixture::new()
            .template("default.tmpl", "<%- include('a') %>")
            .template("a.tmpl", "<%- include('b') %>")
            .template("b.tmpl", "<%- include('a') %>");
        let (run, _) = run_site(&site.services(), "/").await;

        assert_eq!(run.res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(run.res.body_text(), INTERNAL_ERROR_BODY);
        assert_eq!(
            run.report.error.as_ref().unwrap().kind(),
            "template_circular_include"
        );
    }

    #[tokio::test]
    async fn test_finishing_stage_silences_later_stages() {
        let site = SiteFixture::new().template("default.tmpl", "<h1>Hello</h1>");
        let services = site.services();
        let mut stages = default_stages(&services);
        stages.insert(2, Arc::new(FinishingStage::new("early", "done early")));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = Pipeline::new(stages).with_event_sink(Arc::clone(&sink) as Arc<dyn EventSink>);

        let run = run(&pipeline, "/").await;

        assert_eq!(run.res.body_text(), "done early");
        assert_eq!(run.report.executed(), vec!["parse", "route", "early", "cleanup"]);
    }

    #[tokio::test]
    async fn test_route_without_parse_fails() {
        let site = SiteFixture::new().template("default.tmpl", "<h1>Hello</h1>");
        let services = site.services();
        let stages: Vec<Arc<dyn Stage>> = default_stages(&services).into_iter().skip(1).collect();
        let pipeline = Pipeline::new(stages);

        let run = run(&pipeline, "/").await;

        assert_eq!(run.res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(run.res.body_text(), INTERNAL_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_written_response() {
        let site = SiteFixture::new().template("default.tmpl", "<h1>Hello</h1>");
        let parser = Arc::new(FailingCleanupParser::default());
        let services = Arc::new((*site.services()).clone().with_request_parser(parser.clone()));
        let (run, sink) = run_site(&services, "/").await;

        assert_eq!(parser.cleanup_count(), 1);
        assert_eq!(run.res.status(), StatusCode::OK);
        assert_eq!(run.res.body_text(), "<h1>Hello</h1>");
        assert!(run.report.is_success());
        assert_eq!(sink.stages_with(PipelineEventKind::StageFailed), vec!["cleanup"]);
    }

    #[tokio::test]
    async fn test_only_first_failure_is_handled_and_cleanup_always_runs() {
        let log = StageLog::default();
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(RecordingStage::new("first", &log)),
            Arc::new(FailingStage::new("boom", "first failure")),
            Arc::new(RecordingStage::new("never", &log)),
            Arc::new(RecordingStage::new("release", &log).with_kind(StageKind::Cleanup)),
        ];
        let pipeline = Pipeline::new(stages);

        let run = run(&pipeline, "/").await;

        assert_eq!(*log.lock(), vec!["first", "release"]);
        assert_eq!(run.res.body_text(), INTERNAL_ERROR_BODY);
        assert!(run.report.error.unwrap().to_string().contains("first failure"));
    }

    #[tokio::test]
    async fn test_stage_can_turn_render_off() {
        let site = SiteFixture::new().template("default.tmpl", "<h1>Hello</h1>");
        let services = site.services_with(controllers("default", json!({"raw": true})));
        let mut stages = default_stages(&services);
        stages.insert(
            4,
            Arc::new(FnStage::new("no_render", |req: &mut RequestContext, _res: &mut ResponseContext| {
                req.set_render_requested(false);
                Ok(StageOutput::ok())
            })),
        );

        let run = run(&Pipeline::new(stages), "/").await;

        assert_eq!(run.res.body_text(), r#"{"raw":true}"#);
    }
}
