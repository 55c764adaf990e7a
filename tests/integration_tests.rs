//! # Integration Tests for AdaptiveDrive
//!
//! End-to-end checks from the outside of the crate: driving scenarios
//! through the public API, live-context flows with fake providers, HTTP
//! adapters against mock servers, token persistence and the CLI binary.

use adaptive_drive::catalog::{Catalog, CatalogSource, Category};
use adaptive_drive::classifier::{classify, Rule};
use adaptive_drive::context::{DriveContext, Weather};
use adaptive_drive::engine::recommend;
use adaptive_drive::selection::{SelectionConfig, SelectionPath};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process::Command;

fn ctx(speed: u32, hour: u8, weather: Weather) -> DriveContext {
    DriveContext::new(speed, hour, weather).expect("valid context")
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_fast_clear_afternoon() {
        let context = ctx(95, 14, Weather::Clear);
        assert_eq!(
            classify(&context),
            vec![Category::Rock, Category::Electro, Category::Pop]
        );

        let playlist = recommend(
            &context,
            &Catalog::seed(),
            &SelectionConfig::default(),
            &mut StdRng::seed_from_u64(10),
        );
        let mut ids: Vec<_> = playlist.tracks.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["2", "3", "6", "7", "9"]);
    }

    #[test]
    fn test_slow_rainy_afternoon_is_cozy() {
        let context = ctx(30, 15, Weather::Rain);
        assert_eq!(Rule::matching(&context), Rule::CozyWeather);

        let playlist = recommend(
            &context,
            &Catalog::seed(),
            &SelectionConfig::default(),
            &mut StdRng::seed_from_u64(11),
        );
        assert_eq!(playlist.len(), 6);
        assert!(playlist.tracks.iter().all(|t| matches!(
            t.category,
            Category::Chill | Category::Jazz | Category::Acoustic
        )));
    }

    #[test]
    fn test_morning_snow_skips_morning_rule() {
        assert_eq!(Rule::matching(&ctx(30, 8, Weather::Snow)), Rule::CozyWeather);
        assert_eq!(Rule::matching(&ctx(30, 8, Weather::Cloudy)), Rule::MorningMild);
    }

    #[test]
    fn test_speed_beats_every_other_rule() {
        for (hour, weather) in [(7, Weather::Clear), (23, Weather::Rain), (3, Weather::Snow)] {
            assert_eq!(Rule::matching(&ctx(91, hour, weather)), Rule::HighSpeedFocus);
        }
        assert_ne!(Rule::matching(&ctx(90, 14, Weather::Clear)), Rule::HighSpeedFocus);
    }

    #[test]
    fn test_catalog_without_matches_falls_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("classical.json");
        std::fs::write(
            &path,
            r#"[
                {"id":"c1","name":"Adagio","artist":"Orchestra","duration_secs":300,"category":"classical"},
                {"id":"c2","name":"Largo","artist":"Orchestra","duration_secs":240,"category":"classical"}
            ]"#,
        )?;

        let catalog = Catalog::load(Some(path.as_path()))?;
        assert_eq!(catalog.source(), &CatalogSource::File(path.clone()));

        let playlist = recommend(
            &ctx(95, 14, Weather::Clear),
            &catalog,
            &SelectionConfig::default(),
            &mut StdRng::seed_from_u64(12),
        );
        assert_eq!(playlist.path, SelectionPath::Fallback);
        assert_eq!(playlist.len(), 2);
        Ok(())
    }
}

#[cfg(test)]
mod live_context_tests {
    use super::*;
    use adaptive_drive::normalizer::{ContextNormalizer, LiveSources, Status};
    use adaptive_drive::position::{FeedInput, LineFeedPositionSource};
    use adaptive_drive::weather::{Coordinates, FixedClock, FixedLocation, OpenMeteoClient};
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    async fn open_meteo_returning(server: &mut mockito::Server, code: i32) -> mockito::Mock {
        server
            .mock("GET", "/v1/forecast")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("latitude".into(), "52.52".into()),
                mockito::Matcher::UrlEncoded("longitude".into(), "13.41".into()),
                mockito::Matcher::UrlEncoded("current_weather".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"current_weather":{{"weathercode":{code}}}}}"#))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_resync_against_mock_forecast_and_file_feed() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = open_meteo_returning(&mut server, 3).await;

        let mut feed = tempfile::NamedTempFile::new()?;
        writeln!(feed, "5")?;
        writeln!(feed, "garbage")?;
        writeln!(feed, "30")?;

        let sources = LiveSources {
            location: Arc::new(FixedLocation(Some(Coordinates {
                latitude: 52.52,
                longitude: 13.41,
            }))),
            weather: Arc::new(OpenMeteoClient::new(server.url(), Duration::from_secs(5))?),
            clock: Arc::new(FixedClock(7)),
            positions: Arc::new(LineFeedPositionSource::new(FeedInput::File(
                feed.path().to_path_buf(),
            ))),
        };
        let mut normalizer = ContextNormalizer::new(ctx(0, 12, Weather::Clear), sources);

        assert_eq!(normalizer.resync().await, Status::LiveAuto);
        mock.assert_async().await;
        assert_eq!(normalizer.context(), ctx(0, 7, Weather::Cloudy));
        assert_eq!(Rule::matching(&normalizer.context()), Rule::MorningMild);

        // 5 m/s = 18 km/h
        let first = normalizer.next_tick().await;
        assert_eq!(normalizer.apply_speed_tick(first).map(|c| c.speed()), Some(18));

        let bad = normalizer.next_tick().await;
        assert!(bad.is_err());
        assert!(normalizer.apply_speed_tick(bad).is_none());

        // 30 m/s = 108 km/h
        let fast = normalizer.next_tick().await;
        let context = normalizer.apply_speed_tick(fast).expect("speed changed");
        assert_eq!(Rule::matching(&context), Rule::HighSpeedFocus);
        assert_eq!(normalizer.status(), Status::LiveAuto);
        Ok(())
    }

    #[tokio::test]
    async fn test_forecast_outage_degrades() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/forecast")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let initial = ctx(50, 16, Weather::Rain);
        let sources = LiveSources {
            location: Arc::new(FixedLocation(Some(Coordinates {
                latitude: 52.52,
                longitude: 13.41,
            }))),
            weather: Arc::new(OpenMeteoClient::new(server.url(), Duration::from_secs(5))?),
            ..LiveSources::offline()
        };
        let mut normalizer = ContextNormalizer::new(initial, sources);

        assert_eq!(normalizer.resync().await, Status::Degraded);
        assert_eq!(normalizer.context(), initial);
        Ok(())
    }
}

#[cfg(test)]
mod token_store_tests {
    use adaptive_drive::db::{SqliteTokenStore, TokenStore, ACCESS_TOKEN_KEY};
    use adaptive_drive::spotify::{SpotifyConfig, SpotifySession};
    use anyhow::Result;

    #[tokio::test]
    async fn test_login_persists_across_sessions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("state.db");

        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"persisted"}"#)
            .create_async()
            .await;
        let config = SpotifyConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            token_url: format!("{}/api/token", server.url()),
            api_base: server.url(),
            ..SpotifyConfig::default()
        };

        {
            let mut session = SpotifySession::new(config.clone(), SqliteTokenStore::open(&db_path)?)?;
            assert!(!session.is_authenticated());
            session.exchange_code("code").await?;
        }

        let mut restored = SpotifySession::new(config, SqliteTokenStore::open(&db_path)?)?;
        assert!(restored.is_authenticated());

        restored.logout()?;
        let store = SqliteTokenStore::open(&db_path)?;
        assert_eq!(store.get(ACCESS_TOKEN_KEY)?, None);
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn adaptive_drive() -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_adaptive-drive"));
        cmd.env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = adaptive_drive()
            .arg("--help")
            .output()
            .expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("adaptive-drive"));
        assert!(stdout.contains("recommend"));
        assert!(stdout.contains("live"));
        assert!(stdout.contains("spotify"));
    }

    #[test]
    fn test_recommend_command() {
        let output = adaptive_drive()
            .args(["recommend", "--speed", "95", "--hour", "14", "--weather", "clear", "--seed", "3"])
            .output()
            .expect("Failed to run recommend command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("HIGH_SPEED_FOCUS"));
        assert!(stdout.contains("Now Playing"));
    }

    #[test]
    fn test_classify_rejects_bad_hour() {
        let output = adaptive_drive()
            .args(["classify", "--hour", "24"])
            .output()
            .expect("Failed to run classify command");
        assert!(!output.status.success());
    }

    #[test]
    fn test_weather_code_command() {
        let output = adaptive_drive()
            .args(["weather-code", "75"])
            .output()
            .expect("Failed to run weather-code command");

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "snow");
    }

    #[test]
    fn test_catalog_command() {
        let output = adaptive_drive()
            .arg("catalog")
            .output()
            .expect("Failed to run catalog command");

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("11 tracks"));
    }

    #[test]
    fn test_spotify_login_url_uses_env_credentials() {
        let output = adaptive_drive()
            .args(["spotify", "login-url", "--no-persist"])
            .env("ADAPTIVE_DRIVE_SPOTIFY_CLIENT_ID", "my-client")
            .output()
            .expect("Failed to run spotify login-url");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("client_id=my-client"));
        assert!(stdout.contains("response_type=code"));
    }

    #[test]
    fn test_completion_generation() {
        let output = adaptive_drive()
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("adaptive-drive"));
        assert!(stdout.contains("complete"));
    }
}
