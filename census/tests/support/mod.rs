pub mod ollama;

use std::net::TcpListener;
use std::path::Path;

use llm_census::common::config::ScanConfig;

/// 空いているポート番号を取得する（接続すると拒否される）
#[allow(dead_code)]
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

/// 一時ディレクトリ配下のファイルを使う短いリトライ間隔の設定
#[allow(dead_code)]
pub fn test_config(dir: &Path) -> ScanConfig {
    ScanConfig {
        input_path: dir.join("raw_input.json"),
        output_path: dir.join("data").join("live_servers.json"),
        max_concurrency: 8,
        probe_timeout_secs: 2,
        retry_base_delay_ms: 10,
        ..ScanConfig::default()
    }
}

/// 候補フィードを1行1オブジェクトで書き出す
#[allow(dead_code)]
pub fn write_feed(path: &Path, ports: &[u16]) {
    let lines: Vec<String> = ports
        .iter()
        .map(|port| {
            serde_json::json!({
                "ip": "127.0.0.1",
                "port": port,
                "city": "Testville",
                "country": "ZZ"
            })
            .to_string()
        })
        .collect();
    std::fs::write(path, lines.join("\n")).expect("write feed");
}
