//! Serve 模式（常驻服务 + 交互式 Shell）
//!
//! 专用输入线程 + crossbeam 通道：rustyline 在输入线程内阻塞，
//! 主线程同时等待用户输入和 Ctrl+C 信号。

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded, select};
use lelamp_sdk::driver::Lamp;
use lelamp_sdk::tools::RecordingSource;
use rustyline::Editor;
use std::thread;

use crate::commands::CliConfig;

/// 历史记录文件
const HISTORY_FILE: &str = ".lelamp_history";

/// Shell 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Play(String),
    Home,
    Offset { name: String, value: i64 },
    Offsets,
    Save,
    List,
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    /// 解析一行输入
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = parts.split_first() else {
            anyhow::bail!("空命令");
        };

        let command = match (head, args) {
            ("play", [name]) => ShellCommand::Play(name.to_string()),
            ("play", _) => anyhow::bail!("用法: play <name>"),
            ("home", []) => ShellCommand::Home,
            ("offset", [name, value]) => {
                let value = value
                    .parse::<i64>()
                    .map_err(|_| anyhow::anyhow!("无效的零位值: {}", value))?;
                ShellCommand::Offset {
                    name: name.to_string(),
                    value,
                }
            },
            ("offset", _) => anyhow::bail!("用法: offset <joint> <value>"),
            ("offsets", []) => ShellCommand::Offsets,
            ("save", []) => ShellCommand::Save,
            ("list", []) => ShellCommand::List,
            ("status", []) => ShellCommand::Status,
            ("help", []) => ShellCommand::Help,
            ("quit" | "exit", []) => ShellCommand::Quit,
            _ => anyhow::bail!("未知命令: {}", line.trim()),
        };
        Ok(command)
    }
}

/// 输入线程事件
enum InputEvent {
    Line(String),
    /// Ctrl+C（rustyline 原始模式下不会产生 SIGINT）
    Interrupted,
    /// Ctrl+D 或输入错误
    Eof,
}

/// REPL 输入（专用输入线程）
struct ReplInput {
    event_rx: Receiver<InputEvent>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    fn new() -> Result<Self> {
        let (event_tx, event_rx) = bounded::<InputEvent>(10);

        let input_thread = thread::Builder::new()
            .name("lelamp-input".into())
            .spawn(move || {
                use rustyline::history::DefaultHistory;

                let mut rl = Editor::<(), DefaultHistory>::new()
                    .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;
                rl.load_history(HISTORY_FILE).ok(); // 首次运行没有历史文件

                loop {
                    let event = match rl.readline("lelamp> ") {
                        Ok(line) => {
                            let line = line.trim().to_string();
                            if line.is_empty() {
                                continue;
                            }
                            let _ = rl.add_history_entry(line.clone());
                            InputEvent::Line(line)
                        },
                        Err(rustyline::error::ReadlineError::Interrupted) => {
                            println!("^C");
                            InputEvent::Interrupted
                        },
                        Err(rustyline::error::ReadlineError::Eof) => InputEvent::Eof,
                        Err(err) => {
                            eprintln!("Error: {:?}", err);
                            InputEvent::Eof
                        },
                    };

                    let done = !matches!(event, InputEvent::Line(_));
                    if event_tx.send(event).is_err() || done {
                        break;
                    }
                }

                rl.save_history(HISTORY_FILE).ok();
                Ok(())
            })
            .context("创建输入线程失败")?;

        Ok(Self {
            event_rx,
            _input_thread: input_thread,
        })
    }
}

/// 运行 Serve 模式
pub fn run_serve(config: &CliConfig, port: Option<&str>) -> Result<()> {
    println!("⏳ 连接到台灯...");
    let mut lamp = config.builder(port).start().context("启动台灯服务失败")?;
    println!("✅ 服务已启动");

    let (signal_tx, signal_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    })
    .context("安装 Ctrl+C 处理器失败")?;

    println!();
    println!("LeLamp CLI v{} - 交互式 Shell", env!("CARGO_PKG_VERSION"));
    println!("输入 'help' 查看帮助，'quit' 退出");
    println!();

    let input = ReplInput::new()?;

    loop {
        select! {
            recv(input.event_rx) -> event => match event {
                Ok(InputEvent::Line(line)) => match ShellCommand::parse(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(command) => {
                        if let Err(err) = handle_command(&lamp, config, command) {
                            eprintln!("❌ Error: {:#}", err);
                        }
                    },
                    Err(err) => {
                        eprintln!("❌ {}", err);
                        print_help_hint(&line);
                    },
                },
                Ok(InputEvent::Interrupted) => {
                    eprintln!("🛑 收到 Ctrl+C，停止服务...");
                    break;
                },
                Ok(InputEvent::Eof) | Err(_) => break,
            },

            recv(signal_rx) -> _ => {
                eprintln!("\n🛑 收到 Ctrl+C，停止服务...");
                break;
            },
        }
    }

    println!("⏳ 停止服务（关闭扭矩）...");
    lamp.stop()?;
    println!("👋 再见！");
    Ok(())
}

/// 处理命令
fn handle_command(lamp: &Lamp, config: &CliConfig, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Play(name) => {
            if lamp.recordings().load(&name)?.is_none() {
                anyhow::bail!("录制不存在: {}", name);
            }
            lamp.play(&name)?;
            println!("▶️  已入队: {}（待执行 {}）", name, lamp.pending());
        },

        ShellCommand::Home => {
            lamp.home()?;
            println!("⏳ 归零已入队");
        },

        ShellCommand::Offset { name, value } => {
            lamp.set_offset(&name, value)?;
            println!("✅ {} 零位 = {}（使用 'save' 保存）", name, value);
        },

        ShellCommand::Offsets => {
            for (joint, offset) in lamp.offsets().iter() {
                println!("  {:<12} {}", joint.name(), offset);
            }
        },

        ShellCommand::Save => {
            lamp.offsets().save(&config.paths.offsets)?;
            println!("✅ 已保存到 {}", config.paths.offsets.display());
        },

        ShellCommand::List => {
            let names = lamp.recordings().list()?;
            if names.is_empty() {
                println!("⚠️  没有录制");
            }
            for name in names {
                println!("  {}", name);
            }
        },

        ShellCommand::Status => print_status(lamp),

        ShellCommand::Help => print_help(),

        ShellCommand::Quit => {},
    }

    Ok(())
}

fn print_status(lamp: &Lamp) {
    let state = if lamp.is_animating() { "回放中" } else { "空闲" };
    println!("📊 状态: {}（待执行 {}）", state, lamp.pending());

    let offsets = lamp.offsets();
    for (joint, commanded) in lamp.commanded_positions() {
        let position = commanded.map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "  {:<12} 指令 {:>5}  零位 {:>5}",
            joint.name(),
            position,
            offsets.get(joint)
        );
    }

    let metrics = lamp.metrics();
    println!(
        "  发送 {} 包，写入失败 {}，应答缺失 {}，空闲跳过 {}",
        metrics.packets_sent, metrics.write_errors, metrics.missing_replies, metrics.idle_skips
    );
}

/// 打印帮助信息
fn print_help() {
    println!("可用命令:");
    println!("  play <name>                   回放录制（入队）");
    println!("  home                          回到零位（入队）");
    println!("  offset <joint> <value>        修改关节零位（0-4095）");
    println!("  offsets                       显示当前零位");
    println!("  save                          保存零位到校准文件");
    println!("  list                          列出录制");
    println!("  status                        显示服务状态");
    println!("  help                          显示帮助");
    println!("  quit / exit                   停止服务并退出");
    println!();
    println!("快捷键:");
    println!("  Ctrl+C / Ctrl+D               停止服务并退出");
    println!();
}

/// 提供基于错误的帮助提示
fn print_help_hint(command: &str) {
    if command.starts_with("play") {
        eprintln!("💡 提示: 使用 'play wave' 回放 recordings/wave.csv");
    } else if command.starts_with("offset") {
        eprintln!("💡 提示: 使用 'offset base_yaw 2048' 修改零位");
    } else {
        eprintln!("💡 提示: 输入 'help' 查看所有命令");
    }
}
