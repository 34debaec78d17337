use std::path::Path;

use actix_files::{Files, NamedFile};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Serialize;
use serde_json::json;

use crate::config::Config;
use crate::database::{self, Database, DatabaseError};
use crate::sensor::ReadingBatch;

fn map_database_error_to_http(err: DatabaseError) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": err.to_string() }))
}

fn map_db_call_to_http_response<R: Serialize>(db_result: Result<R, DatabaseError>) -> HttpResponse {
    match db_result {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(err) => map_database_error_to_http(err),
    }
}

/// Runs `op` on the blocking pool; store calls may wait on the write lock.
async fn run_db<D, R, F>(db: web::Data<D>, op: F) -> Result<R, DatabaseError>
where
    D: Database + Send + Sync + 'static,
    R: Send + 'static,
    F: FnOnce(&D) -> Result<R, DatabaseError> + Send + 'static,
{
    web::block(move || op(db.get_ref()))
        .await
        .map_err(|_| DatabaseError::Blocking)?
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body("<html><head><title>Not found</title><body><h1>404</h1></html>")
}

pub async fn index(config: web::Data<Config>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(config.html_dir.join("index.html")).await?)
}

//#[get("/api/sensors")]
pub async fn sensors_list<D>(db: web::Data<D>) -> HttpResponse
where
    D: Database + Send + Sync + 'static,
{
    map_db_call_to_http_response(run_db(db, |db| db.serial_names()).await)
}

/// First value of `name` in the query string; repeated keys are ignored.
fn first_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

//#[get("/api/readings/{start}/{end}")]
pub async fn readings_range<D>(
    request: web::Path<(String, String)>,
    query: web::Query<Vec<(String, String)>>,
    db: web::Data<D>,
) -> HttpResponse
where
    D: Database + Send + Sync + 'static,
{
    let (start, end) = request.into_inner();
    let params = query.into_inner();
    let mut errors = Vec::new();

    let start = parse_timestamp("start", &start, &mut errors);
    let end = parse_timestamp("end", &end, &mut errors);

    // Validated only; results are not capped.
    if let Err(err) = first_param(&params, "limit").unwrap_or("0").parse::<i64>() {
        errors.push(format!("ERROR limit value: {}", err));
    }

    // Validated only; results are not filtered by sensor.
    let sensors = requested_sensors(first_param(&params, "sensors"));
    if !sensors.is_empty() {
        match run_db(db.clone(), move |db| db.missing_serials(&sensors)).await {
            Ok(missing) => errors.extend(
                missing
                    .into_iter()
                    .map(|serial| format!("ERROR missing sensor: {}", serial)),
            ),
            Err(err) => errors.push(err.to_string()),
        }
    }

    match (start, end) {
        (Some(start), Some(end)) if errors.is_empty() => {
            info!("start = {} end = {}", start, end);
            map_db_call_to_http_response(
                run_db(db, move |db| db.readings_between(&start, &end)).await,
            )
        }
        _ => HttpResponse::BadRequest().json(json!({ "errors": errors })),
    }
}

//#[post("/api/new")]
pub async fn new_readings<D>(body: web::Bytes, db: web::Data<D>) -> HttpResponse
where
    D: Database + Send + Sync + 'static,
{
    let readings: ReadingBatch = match serde_json::from_slice(&body) {
        Ok(readings) => readings,
        Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err.to_string() })),
    };

    let timestamp = database::timestamp_key(&Utc::now());
    match run_db(db, move |db| db.add_readings(&timestamp, &readings)).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => map_database_error_to_http(err),
    }
}

fn parse_timestamp(field: &str, value: &str, errors: &mut Vec<String>) -> Option<String> {
    match value.parse::<i64>() {
        Ok(seconds) => Some(database::unix_timestamp_key(seconds)),
        Err(err) => {
            errors.push(format!("ERROR {} timestamp: {}", field, err));
            None
        }
    }
}

fn requested_sensors(param: Option<&str>) -> Vec<String> {
    match param {
        None | Some("") => Vec::new(),
        Some(list) => list.split(',').map(str::to_string).collect(),
    }
}

/// Registers the JSON API under `/api`.
pub fn routes<D>(cfg: &mut web::ServiceConfig)
where
    D: Database + Send + Sync + 'static,
{
    cfg.service(
        web::scope("/api")
            .route("/sensors", web::get().to(sensors_list::<D>))
            .route("/readings/{start}/{end}", web::get().to(readings_range::<D>))
            .route("/new", web::post().to(new_readings::<D>))
            .default_service(web::route().to(not_found)),
    );
}

/// Registers the landing page and the assets under `<html_dir>/static`.
pub fn frontend(cfg: &mut web::ServiceConfig, html_dir: &Path) {
    cfg.route("/", web::get().to(index)).service(
        Files::new("/static", html_dir.join("static"))
            .use_etag(true)
            .default_handler(web::route().to(not_found)),
    );
}
