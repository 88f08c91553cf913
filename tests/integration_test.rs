use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;

use nox_monitor::features::FeatureMatrix;
use nox_monitor::inference::LinearRegression;
use nox_monitor::routes::{self, AppState};
use nox_monitor::{Config, ModelError, ModelSet, NoxModel};

const UPLOAD: &str = "\
date,sensorA,sensorB,Nox_baf,Nox opsis
01.01.2024 10:00,420,100,,
02.01.2024 10:00,100,460,380,455
";

/// Linear model that returns one input column unchanged.
fn passthrough(name: &str, coefficients: Vec<f64>) -> Box<LinearRegression> {
    Box::new(LinearRegression {
        name: name.to_string(),
        intercept: 0.0,
        coefficients,
        feature_names: None,
    })
}

/// Model that holds its thread for `delay` and records when it starts and
/// finishes.
struct SlowModel {
    delay: Duration,
    started: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl NoxModel for SlowModel {
    fn name(&self) -> &str {
        "slow"
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ModelError> {
        self.started.store(true, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.finished.store(true, Ordering::SeqCst);
        Ok(vec![0.0; features.n_rows()])
    }
}

/// Start the router on an ephemeral port and return its base URL.
async fn spawn_app(models: ModelSet, satellite_url: &str) -> Result<String> {
    // ---
    let config = Config {
        satellite_image_url: satellite_url.to_string(),
        ..Config::default()
    };
    let http = Client::builder().timeout(Duration::from_secs(2)).build()?;
    let app = routes::router(AppState {
        models: Arc::new(models),
        config,
        http,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

/// baf prediction = sensorA, opsis prediction = sensorB.
async fn spawn_default() -> Result<String> {
    // ---
    let models = ModelSet::new(
        passthrough("baf", vec![1.0, 0.0]),
        passthrough("opsis", vec![0.0, 1.0]),
    );
    spawn_app(models, "http://127.0.0.1:9/nox.jpg").await
}

#[tokio::test]
async fn health_reports_loaded_models() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let body: Value = Client::new()
        .get(format!("{}/health", base))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["models"]["baf"], "baf");
    assert_eq!(body["models"]["opsis"], "opsis");
    Ok(())
}

#[tokio::test]
async fn health_answers_while_a_prediction_runs() -> Result<()> {
    // ---
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let slow = SlowModel {
        delay: Duration::from_millis(1500),
        started: started.clone(),
        finished: finished.clone(),
    };
    let models = ModelSet::new(Box::new(slow), passthrough("opsis", vec![0.0, 1.0]));
    let base = spawn_app(models, "http://127.0.0.1:9/nox.jpg").await?;

    let upload = tokio::spawn(
        Client::new()
            .post(format!("{}/predict", base))
            .body(UPLOAD)
            .send(),
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    while !started.load(Ordering::SeqCst) && Instant::now() < deadline {
        tokio::task::yield_now().await;
    }
    assert!(started.load(Ordering::SeqCst));

    // The single test runtime thread stays free while the model computes.
    let health = Client::new().get(format!("{}/health", base)).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    assert!(!finished.load(Ordering::SeqCst));

    let response = upload.await??;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(finished.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test]
async fn predict_returns_augmented_csv() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let response = Client::new()
        .post(format!("{}/predict", base))
        .header("content-type", "text/csv")
        .body(UPLOAD)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-run-id"));
    let disposition = response.headers()["content-disposition"].to_str()?.to_string();
    assert!(disposition.contains("nox_resultats.csv"));

    let text = response.text().await?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "date,sensorA,sensorB,Nox_baf,Nox opsis,Nox_baf_pred,Nox_opsis_pred,Alerte_baf,Alerte_opsis,Alerte",
            "01.01.2024 10:00,420,100,,,420,100,ATTENTION,OK,ATTENTION",
            "02.01.2024 10:00,100,460,380,455,100,460,OK,DANGER,DANGER",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn empty_upload_is_idle() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let client = Client::new();

    let csv = client.post(format!("{}/predict", base)).send().await?;
    assert_eq!(csv.status(), StatusCode::NO_CONTENT);

    let summary = client
        .post(format!("{}/predict/summary", base))
        .send()
        .await?;
    assert_eq!(summary.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn missing_date_column_is_rejected() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let response = Client::new()
        .post(format!("{}/predict", base))
        .body("sensorA,sensorB,Nox_baf,Nox opsis\n1,2,,\n")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("date"));
    Ok(())
}

#[tokio::test]
async fn incompatible_model_is_unprocessable() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let response = Client::new()
        .post(format!("{}/predict", base))
        .body("date,a,b,c,Nox_baf,Nox opsis\n01.01.2024 10:00,1,2,3,,\n")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn summary_filters_by_target_and_range() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let response = Client::new()
        .post(format!(
            "{}/predict/summary?target=OPSIS&start=2024-01-02",
            base
        ))
        .body(UPLOAD)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;

    assert!(body["run_id"].is_string());
    assert_eq!(body["target"], "OPSIS");
    assert_eq!(body["total_rows"], 2);
    assert_eq!(body["filtered_rows"], 1);
    assert_eq!(body["thresholds"]["attention"], 350.0);
    assert_eq!(body["range"]["start"], "2024-01-02");
    assert_eq!(body["range"]["end"], "2024-01-02");
    assert_eq!(body["distribution"]["opsis"]["DANGER"], 1);
    assert_eq!(body["series"][0]["predicted"], 460.0);
    assert_eq!(body["series"][0]["observed"], 455.0);
    assert_eq!(body["series"][0]["alert"], "DANGER");
    assert_eq!(body["table"][0]["Alerte_baf"], "OK");
    assert_eq!(body["table"][0]["Alerte"], "DANGER");
    assert_eq!(body["stats"]["mean"], 460.0);
    assert_eq!(body["stats_baf"]["mean"], 100.0);
    assert_eq!(body["stats_opsis"]["mean"], 460.0);
    Ok(())
}

#[tokio::test]
async fn summary_rejects_inverted_range() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let response = Client::new()
        .post(format!(
            "{}/predict/summary?start=2024-01-05&end=2024-01-01",
            base
        ))
        .body(UPLOAD)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unreachable_satellite_degrades_to_warning() -> Result<()> {
    // ---
    let base = spawn_default().await?;
    let client = Client::new();

    let response = client.get(format!("{}/satellite", base)).send().await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await?;
    assert!(body["warning"].is_string());

    // Predictions are unaffected.
    let predict = client
        .post(format!("{}/predict", base))
        .body(UPLOAD)
        .send()
        .await?;
    assert_eq!(predict.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn shipped_models_score_sample_dataset() -> Result<()> {
    // ---
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let models = ModelSet::load(
        &root.join("models/Nox1_modele.json"),
        &root.join("models/Nox_opsis_linearregression.json"),
    )?;
    let base = spawn_app(models, "http://127.0.0.1:9/nox.jpg").await?;
    let sample = std::fs::read(root.join("data/sample_kiln.csv"))?;

    let response = Client::new()
        .post(format!("{}/predict/summary?target=BAF", base))
        .body(sample)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["total_rows"], 8);
    assert_eq!(body["filtered_rows"], 8);
    assert_eq!(body["distribution"]["combined"]["OK"].as_u64().unwrap_or(0)
        + body["distribution"]["combined"]["ATTENTION"].as_u64().unwrap_or(0)
        + body["distribution"]["combined"]["DANGER"].as_u64().unwrap_or(0), 8);
    Ok(())
}
