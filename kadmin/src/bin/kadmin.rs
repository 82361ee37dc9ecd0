// Copyright ⓒ 2025 Peter Morgan <peter.james.morgan@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::process::ExitCode;

use dotenv::dotenv;
use kadmin_cli::Cli;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    _ = dotenv().ok();

    match Cli::main().await {
        Ok(()) => {
            debug!("done");
            ExitCode::SUCCESS
        }

        Err(error) => {
            let code = error.exit_code();
            error!(%error, code);

            if code == 3 {
                eprintln!("{error}, try again later");
            } else {
                eprintln!("{error}");
            }

            ExitCode::from(code)
        }
    }
}
