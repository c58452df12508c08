use std::path::PathBuf;
use std::sync::mpsc;

use clap::{Parser, Subcommand};

use higu_patcher::chapters::{self, Chapter};
use higu_patcher::progress::ChannelSink;
use higu_patcher::{logger, run_batch, steam};

#[derive(Parser)]
#[command(name = "higu-patcher", version)]
#[command(about = "쓰르라미 울 적에 한글 패치 설치 도구")]
struct Cli {
    /// 기본 챕터 목록 대신 사용할 chapters.json 경로
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 챕터 목록과 설치 여부를 보여줍니다
    List,
    /// 선택한 챕터에 한글 패치를 설치합니다
    Install {
        /// 설치할 챕터 번호 (쉼표로 구분, 예: 1,3,8)
        #[arg(long, value_delimiter = ',')]
        chapters: Vec<usize>,

        /// 설치된 모든 챕터에 패치를 적용합니다
        #[arg(long, conflicts_with = "chapters")]
        all: bool,
    },
}

fn main() {
    if let Err(e) = logger::init() {
        eprintln!("로그 초기화에 실패했어요: {e}");
    }

    let cli = Cli::parse();

    let Some(steam_path) = steam::steam_install_path() else {
        eprintln!("Steam 설치 경로를 찾지 못했어요.");
        std::process::exit(1);
    };

    let library_paths = steam::library_folders(&steam_path);
    if library_paths.is_empty() {
        eprintln!("Steam 라이브러리 폴더가 보이지 않아요.");
        std::process::exit(1);
    }

    let mut all_chapters = match &cli.manifest {
        Some(path) => match chapters::load_manifest(path) {
            Ok(list) => list,
            Err(e) => {
                eprintln!("챕터 목록 {}을(를) 읽지 못했어요: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => chapters::builtin_chapters(),
    };
    chapters::probe_installed(&mut all_chapters, &library_paths);

    match cli.command {
        Command::List => list_chapters(&all_chapters),
        Command::Install {
            chapters: indices,
            all,
        } => install(all_chapters, library_paths, &indices, all),
    }
}

fn list_chapters(all_chapters: &[Chapter]) {
    for (idx, ch) in all_chapters.iter().enumerate() {
        let mark = if ch.installed { "설치됨" } else { "  -  " };
        println!("{:2}. [{mark}] {} ({})", idx + 1, ch.display_name, ch.name);
    }
}

fn select(all_chapters: Vec<Chapter>, indices: &[usize], all: bool) -> Vec<Chapter> {
    if all {
        return all_chapters.into_iter().filter(|c| c.installed).collect();
    }

    let mut selected = vec![];
    for &n in indices {
        if n == 0 || n > all_chapters.len() {
            eprintln!(
                "챕터 번호 {n}은(는) 없어요. 1부터 {}까지 골라주세요.",
                all_chapters.len()
            );
            std::process::exit(2);
        }
        selected.push(all_chapters[n - 1].clone());
    }
    selected
}

fn install(all_chapters: Vec<Chapter>, library_paths: Vec<PathBuf>, indices: &[usize], all: bool) {
    let selected = select(all_chapters, indices, all);
    if selected.is_empty() {
        eprintln!("설치할 챕터를 하나도 고르지 않았어요. --chapters 또는 --all로 골라주세요.");
        std::process::exit(2);
    }

    log::info!(
        "Starting patch batch for {} chapter(s)",
        selected.len()
    );

    // One worker thread runs the whole batch; this thread only renders
    // progress so the terminal stays responsive during downloads.
    let (tx, rx) = mpsc::channel();
    let worker = std::thread::spawn(move || {
        let client = reqwest::blocking::Client::new();
        let sink = ChannelSink::new(tx);
        run_batch(&client, &selected, &library_paths, &sink)
    });

    for message in rx {
        println!("{message}");
    }

    match worker.join() {
        Ok(outcome) => {
            if outcome.patched.is_empty() {
                println!("패치가 적용된 챕터가 하나도 없어요.");
            } else {
                println!("다음 챕터에 한글 패치가 잘 적용되었어요:");
                for name in &outcome.patched {
                    println!("  - {name}");
                }
            }
        }
        Err(_) => {
            eprintln!("설치 작업이 비정상 종료되었어요. 로그 파일을 확인해주세요.");
            std::process::exit(1);
        }
    }
}
