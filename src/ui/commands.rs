use std::str::FromStr;

/// Comandos del reproductor, tanto en argv como en el prompt interactivo.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Feeds,
    Show(String),
    Add(String),
    Remove(String),
    Refresh(RefreshTarget),
    Clear,
    Discover(String),
    Detect(String),
    Parse(String),
    Load(String),
    /// Índice 1-based tal como se muestra en la lista.
    Play(Option<usize>),
    Pause,
    Next,
    Prev,
    Seek(f64),
    Speed(f64),
    Status,
    Stats,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshTarget {
    All,
    Feed(String),
}

impl Command {
    /// Comandos que necesitan el reproductor (no tienen sentido en un solo disparo).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Command::Play(_)
                | Command::Pause
                | Command::Next
                | Command::Prev
                | Command::Seek(_)
                | Command::Speed(_)
                | Command::Status
        )
    }

    pub fn from_args<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = args
            .into_iter()
            .map(|arg| arg.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        line.parse()
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or("").to_lowercase();
        let arg = words.next().map(str::to_string);

        let required = |usage: &str| arg.clone().ok_or_else(|| format!("Uso: {}", usage));

        let command = match name.as_str() {
            "feeds" | "ls" => Command::Feeds,
            "show" => Command::Show(required("show <feed-id>")?),
            "add" => Command::Add(required("add <url>")?),
            "remove" | "rm" => Command::Remove(required("remove <feed-id>")?),
            "refresh" => match required("refresh <feed-id|all>")?.as_str() {
                "all" => Command::Refresh(RefreshTarget::All),
                id => Command::Refresh(RefreshTarget::Feed(id.to_string())),
            },
            "clear" => Command::Clear,
            "discover" => Command::Discover(required("discover <url>")?),
            "detect" => Command::Detect(required("detect <url>")?),
            "parse" => Command::Parse(required("parse <url>")?),
            "load" => Command::Load(required("load <feed-id>")?),
            "play" | "p" => match arg.as_deref() {
                Some(n) => Command::Play(Some(parse_index(n)?)),
                None => Command::Play(None),
            },
            "pause" => Command::Pause,
            "next" | "n" => Command::Next,
            "prev" | "previous" => Command::Prev,
            "seek" => Command::Seek(parse_number(&required("seek <segundos|m:ss>")?)?),
            "speed" => Command::Speed(parse_number(&required("speed <0.25-2.5>")?)?),
            "status" | "np" => Command::Status,
            "stats" => Command::Stats,
            "help" | "?" | "" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("Comando no reconocido: {}", other)),
        };

        Ok(command)
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Número de pista inválido: {}", raw)),
    }
}

fn parse_number(raw: &str) -> Result<f64, String> {
    if raw.contains(':') {
        return crate::player::clock_seconds(raw).ok_or_else(|| format!("Tiempo inválido: {}", raw));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("Número inválido: {}", raw))
}

pub const HELP: &str = "\
Comandos:
  feeds                 lista los feeds
  show <id>             pistas de un feed
  add <url>             agrega un feed RSS/JSON
  remove <id>           elimina un feed custom
  refresh <id|all>      refresca feeds custom
  clear                 elimina todos los feeds custom
  discover <url>        busca feeds anunciados en una página
  detect <url>          indica si la URL parece un feed
  parse <url>           muestra el feed normalizado en JSON
  load <id>             carga un feed en el reproductor
  play [n]              reproduce (opcionalmente la pista n)
  pause | next | prev   transporte
  seek <s|m:ss>         salta a una posición
  speed <x>             velocidad (0.25 - 2.5)
  status                pista actual
  stats                 estadísticas de almacenamiento y caché
  quit                  salir";
