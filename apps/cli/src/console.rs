//! 操作员停止请求
//!
//! 控制台线程读取 stdin，收到一行 `q` 时设置停止标志；Ctrl+C 设置同一个标志。
//! 时序驱动在下一个周期开始时观察到标志并安全停机。

use actlab_control::StopFlag;
use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::thread;
use tracing::debug;

/// 注册 Ctrl+C 处理器并启动控制台线程
pub fn install_stop_handlers(stop: &StopFlag) -> Result<()> {
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        eprintln!("\n🛑 收到 Ctrl+C，正在停止测试...");
        flag.set();
    })
    .context("注册 Ctrl+C 处理器失败")?;

    let flag = stop.clone();
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || watch_console(io::stdin().lock(), &flag))
        .context("启动控制台线程失败")?;

    Ok(())
}

/// 读取输入直到收到 `q` 或输入结束
fn watch_console<R: BufRead>(input: R, stop: &StopFlag) {
    for line in input.lines() {
        match line {
            Ok(line) if is_quit(&line) => {
                println!("🛑 收到停止请求");
                stop.set();
                return;
            },
            Ok(_) => {},
            Err(e) => {
                debug!("Console closed: {}", e);
                return;
            },
        }
    }
}

fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}
