// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-rendered HTML pages.
//!
//! Every interpolated value goes through [`escape`].

use crate::models::{Goal, Profile, Session};
use crate::time_utils::format_expiry;
use axum::response::Html;
use std::fmt::Write as _;

pub const CALLBACK_ERROR_MESSAGE: &str =
    "There was an error processing your authentication. Please try again.";
pub const CHECK_EMAIL_MESSAGE: &str = "Check your email for the confirmation link.";

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f9fafb;color:#111827}\
nav{display:flex;justify-content:space-between;align-items:center;padding:0 2rem;height:4rem;background:#fff;box-shadow:0 1px 2px #0001}\
nav a{margin-right:1.5rem}main{max-width:60rem;margin:2rem auto;padding:0 1rem}\
.card{background:#fff;border-radius:.5rem;box-shadow:0 1px 3px #0002;padding:1.5rem;margin-bottom:2rem}\
.error{background:#fef2f2;border-left:4px solid #f87171;color:#b91c1c;padding:1rem}\
.notice{background:#eff6ff;border-left:4px solid #60a5fa;color:#1d4ed8;padding:1rem}\
.goal{border:1px solid #e5e7eb;border-radius:.5rem;padding:1rem;margin-bottom:1rem}\
.done{color:#16a34a}label{display:block;margin-top:.75rem}";

/// Escape text for HTML element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn page(title: &str, nav: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{} | FitForge</title><style>{}</style></head>\
         <body>{}<main>{}</main></body></html>",
        escape(title),
        STYLE,
        nav,
        body
    ))
}

fn signed_in_nav() -> &'static str {
    "<nav><div><strong>FitForge</strong> \
     <a href=\"/dashboard\">Dashboard</a><a href=\"/dashboard/profile\">Profile</a></div>\
     <form method=\"post\" action=\"/api/auth/sign-out\"><button type=\"submit\">Sign out</button></form></nav>"
}

fn banner(class: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!("<div class=\"{}\" role=\"alert\">{}</div>", class, escape(m)))
        .unwrap_or_default()
}

pub fn landing(signed_in: bool) -> Html<String> {
    let cta = if signed_in {
        "<a href=\"/dashboard\">Go to your dashboard</a>"
    } else {
        "<a href=\"/auth\">Get Started</a>"
    };
    let body = format!(
        "<h1>Welcome to FitForge</h1>\
         <p>Your personal fitness tracking app. Track workouts, set goals, and achieve your fitness dreams.</p>\
         <p>{}</p>\
         <div class=\"card\"><h2>Track Workouts</h2><p>Log your exercises, sets, reps, and weights to monitor your progress over time.</p></div>\
         <div class=\"card\"><h2>Set Goals</h2><p>Create personalized fitness goals and track your journey to achieving them.</p></div>\
         <div class=\"card\"><h2>Analyze Progress</h2><p>View detailed statistics and charts to understand your fitness improvements.</p></div>",
        cta
    );
    page("Welcome", "", &body)
}

/// Which form the auth page leads with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthPage<'a> {
    pub mode: AuthMode,
    pub email: &'a str,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

impl Default for AuthPage<'_> {
    fn default() -> Self {
        Self {
            mode: AuthMode::SignIn,
            email: "",
            error: None,
            notice: None,
        }
    }
}

pub fn auth_page(view: AuthPage<'_>) -> Html<String> {
    let (heading, action, button, autocomplete, switch) = match view.mode {
        AuthMode::SignIn => (
            "Sign in to your account",
            "/api/auth/sign-in",
            "Sign in",
            "current-password",
            "Don't have an account? <a href=\"/auth?mode=sign-up\">Sign up</a>",
        ),
        AuthMode::SignUp => (
            "Create your account",
            "/api/auth/sign-up",
            "Sign up",
            "new-password",
            "Already have an account? <a href=\"/auth\">Sign in</a>",
        ),
    };

    let body = format!(
        "<div class=\"card\"><h1>{heading}</h1><p>{switch}</p>{error}{notice}\
         <form method=\"post\" action=\"{action}\">\
         <label for=\"email\">Email address</label>\
         <input id=\"email\" name=\"email\" type=\"email\" autocomplete=\"email\" required value=\"{email}\">\
         <label for=\"password\">Password</label>\
         <input id=\"password\" name=\"password\" type=\"password\" autocomplete=\"{autocomplete}\" required>\
         <p><button type=\"submit\">{button}</button></p></form></div>",
        error = banner("error", view.error),
        notice = banner("notice", view.notice),
        email = escape(view.email),
    );
    page(heading, "", &body)
}

fn goal_card(goal: &Goal) -> String {
    let status = if goal.completed {
        "<span class=\"done\">Completed</span>"
    } else {
        "<span>In Progress</span>"
    };
    format!(
        "<div class=\"goal\"><h3>{}</h3><p>{}</p><p>Progress: <strong>{}</strong></p><p>{}</p></div>",
        escape(&goal.title),
        escape(goal.description.as_deref().unwrap_or("")),
        escape(&goal.progress_label()),
        status
    )
}

fn goal_list(goals: &[Goal]) -> String {
    if goals.is_empty() {
        return "<p>No goals set yet. Create your first fitness goal!</p>".to_string();
    }
    goals.iter().map(goal_card).collect()
}

pub fn dashboard(session: &Session, goals: &[Goal]) -> Html<String> {
    let body = format!(
        "<div class=\"card\"><h2>Profile</h2><p>Welcome to your fitness tracking dashboard.</p>\
         <h3>User Information</h3><p>Email: {}</p><p>User ID: {}</p><p>Session Valid Until: {}</p></div>\
         <div class=\"card\"><h2>My Workouts</h2><p>Track your fitness journey here.</p>\
         <p>No workouts logged yet. Start tracking your fitness journey today!</p></div>\
         <div class=\"card\"><h2>My Goals</h2><p>Set and track your fitness goals.</p>{}</div>",
        escape(&session.user.email),
        session.user.id,
        format_expiry(session.expires_at),
        goal_list(goals)
    );
    page("Dashboard", signed_in_nav(), &body)
}

fn number_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

const GOAL_TYPES: &[(&str, &str)] = &[
    ("weight_loss", "Weight Loss"),
    ("muscle_gain", "Muscle Gain"),
    ("endurance", "Endurance"),
    ("strength", "Strength"),
    ("flexibility", "Flexibility"),
];

const UNITS: &[(&str, &str)] = &[
    ("kg", "Kilograms (kg)"),
    ("lbs", "Pounds (lbs)"),
    ("reps", "Repetitions"),
    ("min", "Minutes"),
    ("km", "Kilometers"),
];

fn select(name: &str, options: &[(&str, &str)]) -> String {
    let mut html = format!("<select id=\"{0}\" name=\"{0}\" required>", name);
    for (value, label) in options {
        let _ = write!(html, "<option value=\"{}\">{}</option>", value, label);
    }
    html.push_str("</select>");
    html
}

pub fn profile_page(profile: Option<&Profile>, goals: &[Goal], error: Option<&str>) -> Html<String> {
    let full_name = profile.and_then(|p| p.full_name.as_deref()).unwrap_or("");
    let height = number_value(profile.and_then(|p| p.height));
    let weight = number_value(profile.and_then(|p| p.weight));
    let date_of_birth = profile
        .and_then(|p| p.date_of_birth)
        .map(|d| d.to_string())
        .unwrap_or_default();

    let mut goal_forms = String::new();
    for goal in goals.iter().filter(|g| !g.completed) {
        let _ = write!(
            goal_forms,
            "<form method=\"post\" action=\"/dashboard/goals/{}\">\
             <input type=\"hidden\" name=\"completed\" value=\"true\">\
             <button type=\"submit\">Mark \"{}\" complete</button></form>",
            goal.id,
            escape(&goal.title)
        );
    }

    let body = format!(
        "{error}<div class=\"card\"><h2>Profile Information</h2>\
         <form method=\"post\" action=\"/dashboard/profile\">\
         <label for=\"full_name\">Full Name</label><input id=\"full_name\" name=\"full_name\" type=\"text\" value=\"{full_name}\">\
         <label for=\"height\">Height (cm)</label><input id=\"height\" name=\"height\" type=\"number\" step=\"any\" min=\"0\" value=\"{height}\">\
         <label for=\"weight\">Weight (kg)</label><input id=\"weight\" name=\"weight\" type=\"number\" step=\"any\" min=\"0\" value=\"{weight}\">\
         <label for=\"date_of_birth\">Date of Birth</label><input id=\"date_of_birth\" name=\"date_of_birth\" type=\"date\" value=\"{date_of_birth}\">\
         <p><button type=\"submit\">Update Profile</button></p></form></div>\
         <div class=\"card\"><h2>Fitness Goals</h2>\
         <form method=\"post\" action=\"/dashboard/goals\">\
         <label for=\"title\">Goal Title</label><input id=\"title\" name=\"title\" type=\"text\" required>\
         <label for=\"description\">Description</label><textarea id=\"description\" name=\"description\" rows=\"3\"></textarea>\
         <label for=\"start_date\">Start Date</label><input id=\"start_date\" name=\"start_date\" type=\"date\" required>\
         <label for=\"target_date\">Target Date</label><input id=\"target_date\" name=\"target_date\" type=\"date\">\
         <label for=\"goal_type\">Goal Type</label>{goal_type}\
         <label for=\"unit\">Unit</label>{unit}\
         <label for=\"target_value\">Target Value</label><input id=\"target_value\" name=\"target_value\" type=\"number\" step=\"any\" min=\"0\" required>\
         <label for=\"current_value\">Current Value</label><input id=\"current_value\" name=\"current_value\" type=\"number\" step=\"any\" min=\"0\" required>\
         <p><button type=\"submit\">Create Goal</button></p></form>\
         {goals}{goal_forms}</div>",
        error = banner("error", error),
        full_name = escape(full_name),
        goal_type = select("goal_type", GOAL_TYPES),
        unit = select("unit", UNITS),
        goals = goal_list(goals),
    );
    page("Profile", signed_in_nav(), &body)
}
