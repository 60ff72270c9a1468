pub mod audio;
pub mod config;
#[cfg(feature = "audio-io")]
pub mod live;
pub mod llm;
pub mod messages;
pub mod report;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngenheiroError {
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Audio decode error: {0}")]
    AudioDecodeError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Live session error: {0}")]
    LiveSessionError(String),

    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error("Unsupported attachment: {0}")]
    UnsupportedAttachment(String),

    #[error("Empty submission")]
    EmptySubmission,

    #[error("A request is already in flight")]
    Busy,

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for EngenheiroError {
    fn from(e: std::io::Error) -> Self {
        EngenheiroError::IOError(e.to_string())
    }
}

impl EngenheiroError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Hardware/device errors may require user intervention
            EngenheiroError::AudioDeviceError(_) => false,
            EngenheiroError::AudioDecodeError(_) => true,
            EngenheiroError::AudioProcessingError(_) => true,
            EngenheiroError::LiveSessionError(_) => true,
            EngenheiroError::GenerationError(_) => true,
            EngenheiroError::UnsupportedAttachment(_) => true,
            EngenheiroError::EmptySubmission => true,
            EngenheiroError::Busy => true,
            EngenheiroError::IOError(_) => false,
            EngenheiroError::ConfigError(_) => false,
            EngenheiroError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description (pt-BR, matching the rest of the UI text)
    pub fn user_message(&self) -> String {
        match self {
            EngenheiroError::AudioDeviceError(_) => {
                "Não foi possível acessar o microfone. Verifique as permissões.".to_string()
            }
            EngenheiroError::AudioDecodeError(_) => {
                "Falha ao decodificar o áudio recebido.".to_string()
            }
            EngenheiroError::AudioProcessingError(_) => {
                "Falha no processamento de áudio.".to_string()
            }
            EngenheiroError::LiveSessionError(_) => {
                "A sessão de voz foi encerrada. Tente reconectar.".to_string()
            }
            EngenheiroError::GenerationError(_) => {
                "Erro de comunicação com o sistema especialista.".to_string()
            }
            EngenheiroError::UnsupportedAttachment(_) => "Formato não suportado.".to_string(),
            EngenheiroError::EmptySubmission => {
                "Digite uma consulta ou anexe um documento.".to_string()
            }
            EngenheiroError::Busy => "Aguarde a análise em andamento.".to_string(),
            EngenheiroError::IOError(_) => "Erro de leitura de arquivo.".to_string(),
            EngenheiroError::ConfigError(_) => {
                "Configuração inválida. Verifique a chave de API.".to_string()
            }
            EngenheiroError::ChannelError(_) => {
                "Erro interno de comunicação. Reinicie a aplicação.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EngenheiroError>;
