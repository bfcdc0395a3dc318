use std::fmt;
use std::io::{BufRead, Write as _};
use std::sync::Arc;

use services::lesson_service::sample_lesson;
use services::{
    Clock, LessonService, PlaybackService, QuizSession, QuizSessionService, SimulatedSpeechDriver,
};
use tale_core::model::{Lesson, LessonMode, LessonRequest, Level};
use tale_core::playback::PlaybackRate;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLevel { raw: String },
    InvalidMode { raw: String },
    InvalidRate { raw: String },
    InvalidCount { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::InvalidRate { raw } => write!(f, "invalid --rate value: {raw}"),
            ArgsError::InvalidCount { flag, raw } => {
                write!(f, "invalid {flag} value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_level(raw: &str) -> Option<Level> {
    match raw {
        "beginner" => Some(Level::Beginner),
        "intermediate" => Some(Level::Intermediate),
        "advanced" => Some(Level::Advanced),
        _ => None,
    }
}

fn parse_mode(raw: &str) -> Option<LessonMode> {
    match raw {
        "read" => Some(LessonMode::Read),
        "listen" => Some(LessonMode::Listen),
        _ => None,
    }
}

fn parse_rate(raw: &str) -> Option<PlaybackRate> {
    match raw {
        "slow" => Some(PlaybackRate::Slow),
        "normal" => Some(PlaybackRate::Normal),
        "fast" => Some(PlaybackRate::Fast),
        _ => None,
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --level <beginner|intermediate|advanced>   (default: beginner)");
    eprintln!("  --topic <text>                             (default: everyday life)");
    eprintln!("  --words <n>                                (default: 120)");
    eprintln!("  --questions <n>                            (default: 3)");
    eprintln!("  --vocab <n>                                (default: 5)");
    eprintln!("  --mode <read|listen>                       (default: read)");
    eprintln!("  --rate <slow|normal|fast>                  (default: normal)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TALE_AI_API_KEY, TALE_AI_BASE_URL, TALE_AI_MODEL");
    eprintln!("  Without an API key a built-in sample lesson is used.");
}

struct Args {
    request: LessonRequest,
    rate: PlaybackRate,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut level = Level::Beginner;
        let mut topic = String::from("everyday life");
        let mut word_count: u32 = 120;
        let mut question_count: u32 = 3;
        let mut vocabulary_count: u32 = 5;
        let mut mode = LessonMode::Read;
        let mut rate = PlaybackRate::Normal;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--level" => {
                    let value = require_value(args, "--level")?;
                    level = parse_level(&value).ok_or(ArgsError::InvalidLevel { raw: value })?;
                }
                "--topic" => topic = require_value(args, "--topic")?,
                "--words" => {
                    let value = require_value(args, "--words")?;
                    word_count = value.parse().map_err(|_| ArgsError::InvalidCount {
                        flag: "--words",
                        raw: value,
                    })?;
                }
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    question_count = value.parse().map_err(|_| ArgsError::InvalidCount {
                        flag: "--questions",
                        raw: value,
                    })?;
                }
                "--vocab" => {
                    let value = require_value(args, "--vocab")?;
                    vocabulary_count = value.parse().map_err(|_| ArgsError::InvalidCount {
                        flag: "--vocab",
                        raw: value,
                    })?;
                }
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    mode = parse_mode(&value).ok_or(ArgsError::InvalidMode { raw: value })?;
                }
                "--rate" => {
                    let value = require_value(args, "--rate")?;
                    rate = parse_rate(&value).ok_or(ArgsError::InvalidRate { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg).into()),
            }
        }

        let request = LessonRequest::new(
            level,
            topic,
            word_count,
            question_count,
            vocabulary_count,
            mode,
        )?;
        Ok(Self { request, rate })
    }
}

async fn fetch_lesson(request: &LessonRequest) -> Lesson {
    let service = LessonService::from_env();
    if !service.enabled() {
        log::info!("no TALE_AI_API_KEY configured, using the built-in sample lesson");
        return sample_lesson(request);
    }
    match service.generate(request).await {
        Ok(lesson) => lesson,
        Err(err) => {
            log::warn!("lesson generation failed ({err}), falling back to the sample lesson");
            eprintln!("Could not reach the content service; using a built-in story instead.");
            sample_lesson(request)
        }
    }
}

fn show_story(lesson: &Lesson) {
    println!();
    println!("─── Story ───");
    println!("{}", lesson.story().text());
    if !lesson.vocabulary().is_empty() {
        println!();
        println!("─── Vocabulary ───");
        for entry in lesson.vocabulary() {
            println!("  {}: {}", entry.word(), entry.definition());
        }
    }
    println!();
}

/// Speak the story, printing each word as the highlight reaches it.
async fn listen_along(lesson: &Lesson, rate: PlaybackRate) {
    let driver = Arc::new(SimulatedSpeechDriver::new(280));
    let playback = PlaybackService::new(driver);
    let mut view = playback.subscribe();

    println!("─── Listening ───");
    playback.play(lesson.story(), rate);

    let mut last_printed: Option<usize> = None;
    loop {
        let snapshot = *view.borrow_and_update();
        if let Some(index) = snapshot.current_word_index {
            if last_printed != Some(index) {
                if let Some(word) = lesson.story().word(index) {
                    print!("{word} ");
                    let _ = std::io::stdout().flush();
                }
                last_printed = Some(index);
            }
        }
        if !snapshot.is_speaking {
            if let Some(message) = snapshot.error {
                eprintln!();
                eprintln!("{message}");
            }
            break;
        }
        if view.changed().await.is_err() {
            break;
        }
    }
    println!();
    println!();
}

fn prompt_answer(question_number: usize, option_count: usize) -> Option<usize> {
    let stdin = std::io::stdin();
    loop {
        print!("Question {question_number} answer (A-{}): ", letter(option_count.saturating_sub(1)));
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(_) => return None,
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let selected = trimmed
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase() as usize);
        if let Some(code) = selected {
            let index = code.wrapping_sub('A' as usize);
            if index < option_count {
                return Some(index);
            }
        }
        println!("Please answer with a letter between A and {}.", letter(option_count.saturating_sub(1)));
    }
}

fn letter(index: usize) -> char {
    char::from(b'A' + u8::try_from(index.min(25)).unwrap_or(0))
}

fn run_quiz(lesson: &Lesson) -> Option<QuizSession> {
    if lesson.quiz().is_empty() {
        println!("No quiz questions were generated for this story.");
        return None;
    }

    let quiz = QuizSessionService::new(Clock::default_clock());
    let mut session = match quiz.start(lesson.quiz().to_vec()) {
        Ok(session) => session,
        Err(err) => {
            log::warn!("could not start quiz: {err}");
            return None;
        }
    };

    println!("─── Quiz ───");
    let mut number = 0;
    while let Some(question) = session.current_question().cloned() {
        number += 1;
        println!();
        println!("{number}. {}", question.question());
        for (index, option) in question.options().iter().enumerate() {
            println!("   {}) {option}", letter(index));
        }

        // A degraded question with no options cannot be answered; record an
        // empty selection and move on.
        let answer = if question.options().is_empty() {
            String::new()
        } else {
            let Some(choice) = prompt_answer(number, question.options().len()) else {
                println!();
                println!("Quiz abandoned.");
                return None;
            };
            question.options().get(choice).cloned().unwrap_or_default()
        };
        match quiz.answer_current(&mut session, answer) {
            Ok(outcome) if outcome.correct => println!("   Correct!"),
            Ok(_) => println!("   Not quite. The answer was: {}", question.correct_answer()),
            Err(err) => {
                log::warn!("quiz answer failed: {err}");
                return None;
            }
        }
    }

    Some(session)
}

fn show_summary(session: &QuizSession) {
    let score = session.score();
    println!();
    println!("─── Results ───");
    println!(
        "You got {} of {} correct ({}%).",
        score.correct(),
        score.total(),
        score.percent()
    );
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|err| {
        eprintln!("{err}");
        print_usage();
        err
    })?;

    let lesson = fetch_lesson(&args.request).await;
    show_story(&lesson);

    if args.request.mode() == LessonMode::Listen {
        listen_along(&lesson, args.rate).await;
    }

    if let Some(session) = run_quiz(&lesson) {
        show_summary(&session);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
