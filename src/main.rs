// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use log::info;
use secure_cookies::{
    app::CookieIssuer,
    config::{ServerConfig, CONFIG_ENV},
    InterceptionSwitch, Pipeline, SecureCookies, ValveServer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok()) {
        Some(path) => {
            info!("Loading config from {}", path);
            ServerConfig::from_file(path)?
        }
        None => ServerConfig::default(),
    };

    let switch = InterceptionSwitch::new(config.enabled);
    let pipeline = Pipeline::new(CookieIssuer::new(config.cookies.clone()))
        .with_valve(SecureCookies::new(switch.clone()));

    let server = ValveServer::new(config, pipeline, switch);
    server.start()?;

    let http = server.spawn_http().await;
    let admin = server.spawn_admin().await;

    tokio::select! {
        joined = async { tokio::try_join!(http, admin) } => {
            joined?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    server.stop()?;
    Ok(())
}
