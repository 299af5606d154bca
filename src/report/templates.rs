//! Markup for the HTML report.
//!
//! Every template escapes what it interpolates unless the value is wrapped in
//! `PreEscaped`. Names, results and reason text come straight from the result
//! document and are inserted as-is; failure messages and stack traces are
//! always escaped.

use maud::{html, Markup, PreEscaped, Render, DOCTYPE};

use super::model::{Case, Failure, Fixture, TestRun, Tone};
use super::names::{anchor_id, format_duration};

const REPORT_STYLES: &str = include_str!("../../static/report.css");

const STYLESHEETS: &[&str] = &[
    "http://cdn.jsdelivr.net/bootstrap/3.2.0/css/bootstrap.min.css",
    "http://maxcdn.bootstrapcdn.com/bootswatch/3.2.0/superhero/bootstrap.min.css",
];

const SCRIPTS: &[&str] = &[
    "http://code.jquery.com/jquery-2.1.1.min.js",
    "http://cdn.jsdelivr.net/bootstrap/3.2.0/js/bootstrap.min.js",
];

const TOOLTIP_SCRIPT: &str = r#"
    $(document).ready(function() {
        $('[data-toggle="tooltip"]').tooltip({'placement': 'bottom'});
    });
"#;

/// Complete HTML document around `body`.
pub fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1, maximum-scale=1";
                title { (title) }
                @for href in STYLESHEETS {
                    link rel="stylesheet" type="text/css" href=(href);
                }
                @for src in SCRIPTS {
                    script type="text/javascript" src=(src) {}
                }
                script type="text/javascript" { (PreEscaped(TOOLTIP_SCRIPT)) }
                style { (PreEscaped(REPORT_STYLES)) }
            }
            body { (body) }
        }
    }
}

/// Summary followed by one panel per fixture. The fixture's position in the
/// run is what keeps its dialog anchor unique.
pub fn report_body(run: &TestRun) -> Markup {
    html! {
        div class="container-fluid page" {
            (summary(run))
            div class="row" {
                @for (index, fixture) in run.fixtures.iter().enumerate() {
                    (fixture_panel(fixture, index))
                }
            }
        }
    }
}

pub fn summary(run: &TestRun) -> Markup {
    let panel = match run.tone() {
        Tone::Danger => "panel panel-danger",
        Tone::Warning => "panel panel-warning",
        Tone::Neutral => "panel panel-info",
    };
    let highlight = |active: bool, class: &'static str| if active { class } else { "" };

    html! {
        div class="row" {
            div class="col-md-12" {
                div class=(panel) {
                    div class="panel-heading" {
                        "Summary - " small { (PreEscaped(&run.name)) }
                    }
                    div class="panel-body" {
                        (stat("Tests", run.total, "ignore-val"))
                        (stat("Passed", run.passed, highlight(run.failed > 0, "text-success")))
                        (stat("Failed", run.failed, highlight(run.failed > 0, "text-danger")))
                        (stat("Inconclusive", run.inconclusive, highlight(run.inconclusive > 0, "text-danger")))
                        (stat("Skipped", run.skipped, highlight(run.skipped > 0, "text-warning")))
                        (stat("Success Rate", format!("{}%", run.success_rate()), ""))
                    }
                }
            }
        }
    }
}

fn stat(label: &str, value: impl Render, class: &str) -> Markup {
    let value_class = if class.is_empty() {
        "val".to_string()
    } else {
        format!("val {}", class)
    };
    html! {
        div class="col-md-2 col-sm-4 col-xs-6 text-center" {
            div class="stat" { (label) }
            div class=(value_class) { (value) }
        }
    }
}

pub fn fixture_panel(fixture: &Fixture, index: usize) -> Markup {
    let modal_id = anchor_id(&fixture.name, index);

    html! {
        div class="col-md-3" {
            div class=(format!("panel {}", fixture.kind().panel_class())) {
                div class="panel-heading" {
                    (PreEscaped(&fixture.name)) " - " small { (PreEscaped(&fixture.namespace)) }
                    small class="pull-right" {
                        @if let Some(duration) = fixture.duration_label() { (duration) }
                    }
                    @if let Some(reason) = &fixture.reason {
                        span class="glyphicon glyphicon-info-sign pull-right info hidden-print"
                            data-toggle="tooltip" title=(PreEscaped(reason)) {}
                    }
                }
                div class="panel-body" {
                    div class="text-center" style="font-size: 1.5em;" {
                        (result_counter(&modal_id, fixture.passed, "text-success", "glyphicon-ok-sign", "Passed"))
                        (result_counter(&modal_id, fixture.skipped, "text-warning", "glyphicon-question-sign", "Ignored"))
                        (result_counter(&modal_id, fixture.failed, "text-danger", "glyphicon-remove-sign", "Failed"))
                    }
                    (printable_view(fixture))
                    (fixture_modal(fixture, &modal_id))
                }
            }
        }
    }
}

fn result_counter(modal_id: &str, count: u32, text_class: &str, icon: &str, label: &str) -> Markup {
    html! {
        div style="float: left; margin: 0px 30px;" {
            a href=(format!("#{}", modal_id)) role="button" data-toggle="modal"
                class=(format!("{} no-underline", text_class)) {
                span style="font-weight: bold;" { (count) }
                span class=(format!("glyphicon {}", icon)) {}
                span class="test-result" { (label) }
            }
        }
    }
}

/// Flat list of every case, shown only when printing.
pub fn printable_view(fixture: &Fixture) -> Markup {
    html! {
        div class="visible-print printed-test-result" {
            @if let Some(reason) = &fixture.reason {
                (reason_alert(reason))
            }
            @for case in &fixture.cases {
                div class=(format!("panel {}", case.kind().panel_class())) {
                    div class="panel-heading" {
                        h4 class="panel-title" { (PreEscaped(case.display_name())) }
                    }
                    div class="panel-body" {
                        (case_result(case))
                    }
                }
            }
        }
    }
}

/// Details dialog with one collapsible entry per case.
pub fn fixture_modal(fixture: &Fixture, modal_id: &str) -> Markup {
    let label_id = format!("{}-label", modal_id);
    let accordion_id = format!("{}-accordion", modal_id);

    html! {
        div class="modal fade" id=(modal_id) tabindex="-1" role="dialog"
            aria-labelledby=(label_id) aria-hidden="true" {
            div class="modal-dialog" {
                div class="modal-content" {
                    div class="modal-header" {
                        button type="button" class="close" data-dismiss="modal" aria-hidden="true" { "×" }
                        h4 class="modal-title" id=(label_id) { (PreEscaped(&fixture.name)) }
                    }
                    div class="modal-body" {
                        div class="panel-group no-bottom-margin" id=(accordion_id) {
                            @if let Some(reason) = &fixture.reason {
                                (reason_alert(reason))
                            }
                            @for (index, case) in fixture.cases.iter().enumerate() {
                                (dialog_entry(case, &accordion_id, index))
                            }
                        }
                    }
                    div class="modal-footer" {
                        button type="button" class="btn btn-primary" data-dismiss="modal" { "Close" }
                    }
                }
            }
        }
    }
}

fn dialog_entry(case: &Case, accordion_id: &str, index: usize) -> Markup {
    let entry_id = format!("{}-{}", accordion_id, index);

    html! {
        div class=(format!("panel {}", case.kind().dialog_panel_class())) {
            div class="panel-heading" {
                h4 class="panel-title" {
                    a data-toggle="collapse" data-parent=(format!("#{}", accordion_id))
                        href=(format!("#{}", entry_id)) {
                        (PreEscaped(case.display_name()))
                        small class="pull-right" { (format_duration(case.duration)) }
                    }
                }
            }
            div id=(entry_id) class="panel-collapse collapse" {
                div class="panel-body" {
                    (case_result(case))
                }
            }
        }
    }
}

fn case_result(case: &Case) -> Markup {
    html! {
        div { strong { "Result:" } " " (PreEscaped(&case.result)) }
        @if let Some(failure) = &case.failure {
            (failure_detail(failure))
        }
    }
}

fn failure_detail(failure: &Failure) -> Markup {
    html! {
        div { strong { "Message:" } " " pre { (failure.message) } }
        div {
            strong { "Stack Trace:" } " "
            pre { (failure.stack_trace.as_deref().unwrap_or("N/A")) }
        }
    }
}

fn reason_alert(reason: &str) -> Markup {
    html! {
        div class="alert alert-warning" { strong { "Warning:" } " " (PreEscaped(reason)) }
    }
}
