use actix_web::{error::ErrorInternalServerError, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    boundary::{boundary_of, parse_cell},
    coverage::CoverageService,
    error::CoverageError,
    model::{BoundingBox, Coverage, CoverageFilter},
    render,
    store::PointStore,
};

pub struct AppState<S> {
    pub coverage: CoverageService<S>,
    /// Used when a request does not name a resolution.
    pub resolution: u8,
    /// `(lat, lon)` marked on cluster maps.
    pub base_station: Option<(f64, f64)>,
}

/// Query string of the GET endpoints and body of `POST /api/coverage`.
///
/// `band` is a comma separated list, the bounding box has to be given completely or not at all.
#[derive(Debug, Default, Deserialize)]
pub struct CoverageParams {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lon: Option<f64>,
    pub max_lon: Option<f64>,
    pub band: Option<String>,
    pub resolution: Option<u8>,
}

impl CoverageParams {
    pub fn filter(&self) -> crate::error::Result<CoverageFilter> {
        let bbox = match (self.min_lat, self.max_lat, self.min_lon, self.max_lon) {
            (Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)) => Some(BoundingBox {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            }),
            (None, None, None, None) => None,
            _ => return Err(CoverageError::IncompleteBoundingBox),
        };

        let bands = self
            .band
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(CoverageFilter { bbox, bands })
    }
}

pub fn configure<S: PointStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/coverage")
            .route(web::get().to(coverage_query::<S>))
            .route(web::post().to(coverage_body::<S>)),
    )
    .route("/api/coverage.geojson", web::get().to(coverage_geojson::<S>))
    .route("/api/coverage.svg", web::get().to(coverage_svg::<S>))
    .route("/api/points.svg", web::get().to(points_svg::<S>))
    .route("/api/clusters.svg", web::get().to(clusters_svg::<S>))
    .route("/api/clusters.geojson", web::get().to(clusters_geojson::<S>))
    .route("/api/cells/{cell}/boundary", web::get().to(cell_boundary));
}

async fn compute<S: PointStore>(
    state: &AppState<S>,
    params: &CoverageParams,
) -> actix_web::Result<Coverage> {
    let filter = params.filter()?;
    let resolution = params.resolution.unwrap_or(state.resolution);
    Ok(state.coverage.query(&filter, resolution).await?)
}

async fn coverage_query<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Query<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let coverage = compute(&state, &params).await?;
    Ok(HttpResponse::Ok().json(coverage))
}

async fn coverage_body<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Json<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let coverage = compute(&state, &params).await?;
    Ok(HttpResponse::Ok().json(coverage))
}

async fn coverage_geojson<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Query<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let coverage = compute(&state, &params).await?;
    let body =
        serde_json::to_string(&render::to_geojson(&coverage)).map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("application/geo+json")
        .body(body))
}

async fn coverage_svg<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Query<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let coverage = compute(&state, &params).await?;
    let svg = render::to_svg(&coverage, render::DEFAULT_SIZE).map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().content_type("image/svg+xml").body(svg))
}

// resolution is ignored, these views work on the raw points
async fn points_svg<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Query<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let points = state.coverage.points(&params.filter()?).await?;
    let svg = render::points_to_svg(&points, render::DEFAULT_SIZE).map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().content_type("image/svg+xml").body(svg))
}

async fn clusters_svg<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Query<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let points = state.coverage.points(&params.filter()?).await?;
    let svg = render::clusters_to_svg(&points, state.base_station, render::DEFAULT_SIZE)
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().content_type("image/svg+xml").body(svg))
}

async fn clusters_geojson<S: PointStore + 'static>(
    state: web::Data<AppState<S>>,
    params: web::Query<CoverageParams>,
) -> actix_web::Result<HttpResponse> {
    let points = state.coverage.points(&params.filter()?).await?;
    let hulls = render::band_hulls(&points);
    let body =
        serde_json::to_string(&render::hulls_to_geojson(&hulls)).map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("application/geo+json")
        .body(body))
}

async fn cell_boundary(path: web::Path<String>) -> actix_web::Result<HttpResponse> {
    let cell = parse_cell(&path)?;
    let boundary = boundary_of(u64::from(cell))?;
    Ok(HttpResponse::Ok().json(json!(
        {
            "cell": cell.to_string(),
            "resolution": u8::from(cell.resolution()),
            "boundary": boundary,
        }
    )))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::{header::CONTENT_TYPE, StatusCode},
        test, App,
    };
    use serde_json::Value;

    use super::*;
    use crate::{coverage::tests::fixture, model::MeasurementPoint, store::memory::MemoryStore};

    fn state(store: MemoryStore) -> web::Data<AppState<MemoryStore>> {
        web::Data::new(AppState {
            coverage: CoverageService::new(store, 100_000),
            resolution: 9,
            base_station: Some((52.27664, 104.27792)),
        })
    }

    macro_rules! app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(state($store))
                    .configure(configure::<MemoryStore>),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn coverage_json() {
        let app = app!(MemoryStore::new(fixture()));

        let req = test::TestRequest::get().uri("/api/coverage").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["resolution"], 9);
        assert_eq!(body["skipped"], 1);
        let cells = body["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 3);
        assert!(cells[0]["cell"].is_string());
        assert_eq!(cells[0]["boundary"].as_array().unwrap().len(), 7);

        let req = test::TestRequest::get()
            .uri("/api/coverage?band=LTE2100,%20LTE900&resolution=7")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["resolution"], 7);
        assert_eq!(body["cells"].as_array().unwrap().len(), 1);
        assert_eq!(body["cells"][0]["band"], "LTE2100");
    }

    #[actix_web::test]
    async fn coverage_post() {
        let app = app!(MemoryStore::new(fixture()));
        let req = test::TestRequest::post()
            .uri("/api/coverage")
            .set_json(json!({
                "min_lat": 52.3,
                "max_lat": 52.4,
                "min_lon": 104.2,
                "max_lon": 104.25,
                "band": "LTE1800",
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let cells = body["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0]["point_count"], 2);
        assert_eq!(cells[0]["mean_rsrp"], -86.0);
    }

    #[actix_web::test]
    async fn empty_area() {
        let app = app!(MemoryStore::new(fixture()));
        let req = test::TestRequest::get()
            .uri("/api/coverage?min_lat=-10&max_lat=-5&min_lon=10&max_lon=20")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["cells"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn bad_requests() {
        let app = app!(MemoryStore::new(fixture()));

        for uri in [
            "/api/coverage?resolution=16",
            "/api/coverage?min_lat=10",
            "/api/coverage?min_lat=10&max_lat=5&min_lon=0&max_lon=1",
            "/api/cells/zzz/boundary",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }

        for uri in ["/api/coverage?resolution=16", "/api/coverage.svg?min_lat=10"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["error"]["code"], 400, "{uri}");
            assert!(body["error"]["message"].is_string(), "{uri}");
        }
    }

    #[actix_web::test]
    async fn partial_bbox_is_a_json_error() {
        let app = app!(MemoryStore::new(fixture()));
        let req = test::TestRequest::post()
            .uri("/api/coverage")
            .set_json(json!({ "min_lat": 52.3, "max_lon": 104.25 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["error"]["message"],
            "bounding box needs min_lat, max_lat, min_lon and max_lon"
        );
    }

    #[actix_web::test]
    async fn store_down() {
        let app = app!(MemoryStore {
            points: fixture(),
            unavailable: true,
        });
        let req = test::TestRequest::get().uri("/api/coverage").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn renderings() {
        let app = app!(MemoryStore::new(fixture()));

        let req = test::TestRequest::get()
            .uri("/api/coverage.geojson")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "application/geo+json");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["features"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::get().uri("/api/coverage.svg").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "image/svg+xml");
    }

    #[actix_web::test]
    async fn point_renderings() {
        // eleven LTE1800 points around the station are enough for a hull
        let template = fixture().remove(0);
        let mut points = fixture();
        points.extend((0..11).map(|i| MeasurementPoint {
            latitude: 52.27 + 0.001 * f64::from(i),
            longitude: 104.27 + 0.0001 * f64::from(i * i),
            ..template.clone()
        }));
        let app = app!(MemoryStore::new(points));

        let req = test::TestRequest::get().uri("/api/points.svg?band=LTE2100").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "image/svg+xml");
        let body = test::read_body(resp).await;
        let svg = std::str::from_utf8(&body).unwrap();
        assert!(svg.contains("LTE2100"));
        assert!(!svg.contains("LTE1800"));

        let req = test::TestRequest::get().uri("/api/clusters.svg").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let svg = std::str::from_utf8(&body).unwrap();
        assert!(svg.contains("LTE1800 cluster"));
        assert!(svg.contains("Base station"));

        let req = test::TestRequest::get().uri("/api/clusters.geojson").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "application/geo+json");
        let body: Value = test::read_body_json(resp).await;
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["band"], "LTE1800");
        assert_eq!(features[0]["properties"]["point_count"], 14);
        assert_eq!(features[0]["geometry"]["type"], "Polygon");

        let req = test::TestRequest::get()
            .uri("/api/clusters.svg?min_lat=1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn boundary() {
        let app = app!(MemoryStore::default());
        let cell = crate::index::cell_at(52.330262, 104.208583, h3o::Resolution::Nine).unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/api/cells/{cell}/boundary"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cell"], cell.to_string());
        assert_eq!(body["resolution"], 9);
        assert_eq!(body["boundary"].as_array().unwrap().len(), 7);
    }
}
