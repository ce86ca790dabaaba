use std::env;

fn main() {
    // ENVIRONMENT環境変数に基づいて適切な.envファイルを読み込み
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    println!("cargo:rerun-if-env-changed=ENVIRONMENT");
    println!("cargo:rerun-if-changed={env_file}");

    if dotenv::from_filename(env_file).is_ok() {
        println!("cargo:warning={env_file}ファイルを読み込みました");

        // 送信先URLをコンパイル時定数として埋め込み
        if let Ok(endpoint) = env::var("SUBMISSION_ENDPOINT_URL") {
            println!("cargo:rustc-env=EMBEDDED_SUBMISSION_ENDPOINT_URL={endpoint}");
        }

        // 注意: EMBEDDED_ENVIRONMENTは設定しない
        // 実行時に.envファイルから環境変数を読み込むため
    }
}
