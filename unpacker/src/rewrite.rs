use swf_core::{tag::code, Movie, Sprite, Tag};
use swf_nls::{Decoder, Encoding};

use crate::{
    error::UnpackError,
    locate::{LocateContext, Locators},
    report::{RegionReport, Report, TagReport},
    trace::{Tracer, DEFAULT_STEP_LIMIT},
};

#[derive(Debug, Clone, Copy)]
pub struct UnpackConfig {
    /// tag the obfuscator puts in front of every relocated tag
    pub marker_code: u16,
    /// filler tags dropped from the output
    pub padding_code: u16,
    pub nls: Encoding,
    pub step_limit: u64,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        Self {
            marker_code: code::MARKER,
            padding_code: code::PADDING,
            nls: Encoding::default(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

fn path_string(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

pub struct Unpacker {
    config: UnpackConfig,
    locators: Locators,
    report: Report,
}

impl Unpacker {
    pub fn new(config: UnpackConfig) -> Self {
        Self {
            config,
            locators: Locators::default(),
            report: Report::default(),
        }
    }

    pub fn with_locators(mut self, locators: Locators) -> Self {
        self.locators = locators;
        self
    }

    /// Report of the last run.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Decode a movie, restore every marker/tag pair and encode it again.
    pub fn unpack(&mut self, data: &[u8]) -> Result<Vec<u8>, UnpackError> {
        let mut movie = Movie::decode(data)?;
        self.report = Report {
            version: movie.version,
            compression: format!("{:?}", movie.compression),
            tags: Vec::new(),
        };

        let tracer = Tracer::new(Decoder::new(self.config.nls), self.config.step_limit);
        let tags = std::mem::take(&mut movie.tags);
        movie.tags = self.rewrite_tags(tags, movie.version, &tracer, &mut Vec::new())?;

        log::info!("{} tags restored", self.report.tags.len());
        Ok(movie.encode()?)
    }

    fn rewrite_tags(
        &mut self,
        tags: Vec<Tag>,
        version: u8,
        tracer: &Tracer,
        path: &mut Vec<usize>,
    ) -> Result<Vec<Tag>, UnpackError> {
        let ctx = LocateContext { version, tracer };
        let mut out = Vec::with_capacity(tags.len());
        let mut iter = tags.into_iter().enumerate();

        while let Some((index, tag)) = iter.next() {
            if tag.code == self.config.padding_code {
                if self.config.padding_code != code::PADDING {
                    log::warn!("dropping padding tag {} ({} bytes)", tag.code, tag.data.len());
                } else {
                    log::debug!("dropping padding tag ({} bytes)", tag.data.len());
                }
                continue;
            }

            if tag.code == self.config.marker_code {
                path.push(index);
                let (next_index, next) = match iter.next() {
                    Some(pair) => pair,
                    None => {
                        return Err(UnpackError::MissingSuccessor {
                            code: tag.code,
                            path: path_string(path),
                        })
                    }
                };
                path.pop();
                path.push(next_index);

                let locator = self.locators.get(next.code).ok_or_else(|| UnpackError::NoLocator {
                    code: next.code,
                    path: path_string(path),
                })?;
                let layout = locator.layout();
                let located = locator.locate(&tag, &next, &ctx).map_err(|e| UnpackError::Tag {
                    code: next.code,
                    path: path_string(path),
                    source: Box::new(e),
                })?;

                log::info!(
                    "tag {} at {}: {} bytes -> {} bytes ({})",
                    next.code,
                    path_string(path),
                    next.data.len(),
                    located.tag.data.len(),
                    layout
                );
                self.report.tags.push(TagReport {
                    path: path.clone(),
                    code: next.code,
                    layout: layout.to_string(),
                    original_size: next.data.len(),
                    recovered_size: located.tag.data.len(),
                    regions: located.regions.iter().map(RegionReport::from).collect(),
                });
                path.pop();

                out.push(located.tag);
                continue;
            }

            if tag.code == code::DEFINE_SPRITE {
                path.push(index);
                let mut sprite = Sprite::decode(&tag.data).map_err(|e| UnpackError::Tag {
                    code: tag.code,
                    path: path_string(path),
                    source: Box::new(e.into()),
                })?;
                let tags = std::mem::take(&mut sprite.tags);
                sprite.tags = self.rewrite_tags(tags, version, tracer, path)?;
                path.pop();
                out.push(Tag {
                    code: tag.code,
                    data: sprite.encode()?,
                    force_long: tag.force_long,
                });
                continue;
            }

            out.push(tag);
        }
        Ok(out)
    }
}

/// Unpack with the default configuration.
pub fn unpack(data: &[u8]) -> Result<Vec<u8>, UnpackError> {
    Unpacker::new(UnpackConfig::default()).unpack(data)
}
